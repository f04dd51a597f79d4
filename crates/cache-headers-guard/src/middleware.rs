//! The per-response guard.

use cache_headers::{header_names, Decision, PolicyEngine, PolicyRegistry, NO_CACHE};
use cache_headers_core::{
    AuthContext, AuthEvent, CacheHeadersConfig, ConfigResult, CookieJar, RequestContext,
};
use chrono::{DateTime, Utc};
use http::header::{CACHE_CONTROL, LOCATION, SET_COOKIE};
use http::{HeaderMap, HeaderValue, Response, StatusCode};

use crate::busting;
use crate::error::{GuardError, GuardResult, TamperReason};
use crate::signal::AuthSignal;

/// Why the guard left a response alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Debug mode disables the guard.
    Debug,
    /// The handler already chose a `Cache-Control`.
    ExplicitCacheControl,
    /// Only successful responses are considered.
    Status(StatusCode),
}

/// Why a response was forced to `no-cache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoCacheReason {
    NoAuthContext,
    AuthTransition(AuthEvent),
    AuthSignalResync,
    UnsafeMethod,
    SetsCookie,
    CacheBusted,
}

/// What the guard did to a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    NoCache(NoCacheReason),
    /// The client must re-request `location` so pending messages bypass
    /// the shared cache.
    Redirect { location: String },
    /// The request looks forged and must be answered with 400.
    Rejected(TamperReason),
    /// Policy headers were written.
    Applied { decision: Decision, cacheable: bool },
}

impl Outcome {
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Outcome::Applied { cacheable: true, .. })
    }
}

/// Decides cache headers for each response.
#[derive(Debug, Clone)]
pub struct CacheHeadersMiddleware {
    engine: PolicyEngine,
    signal: AuthSignal,
}

impl CacheHeadersMiddleware {
    pub fn new(engine: PolicyEngine) -> Self {
        let signal = AuthSignal::new(&engine.config().auth_cookie_name);
        Self { engine, signal }
    }

    /// Build the engine and the guard in one step.
    pub fn from_config(config: CacheHeadersConfig, registry: PolicyRegistry) -> ConfigResult<Self> {
        Ok(Self::new(PolicyEngine::new(config, registry)?))
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    pub fn signal(&self) -> &AuthSignal {
        &self.signal
    }

    /// Process a response, then turn redirects and rejections into their
    /// replacement responses.
    pub fn respond<B: From<String>>(
        &self,
        req: &RequestContext,
        mut resp: Response<B>,
    ) -> GuardResult<Response<B>> {
        match self.process(req, &mut resp)? {
            Outcome::Redirect { location } => redirect_response(&location),
            Outcome::Rejected(reason) => Ok(rejection_response(&reason)),
            _ => Ok(resp),
        }
    }

    /// Update the response headers in place.
    pub fn process<B>(&self, req: &RequestContext, resp: &mut Response<B>) -> GuardResult<Outcome> {
        self.process_at(req, resp, Utc::now())
    }

    /// Like [`process`](Self::process) with an explicit clock.
    pub fn process_at<B>(
        &self,
        req: &RequestContext,
        resp: &mut Response<B>,
        now: DateTime<Utc>,
    ) -> GuardResult<Outcome> {
        let config = self.engine.config();

        if config.debug {
            return Ok(Outcome::Skipped(SkipReason::Debug));
        }
        if resp.headers().contains_key(CACHE_CONTROL) {
            return Ok(Outcome::Skipped(SkipReason::ExplicitCacheControl));
        }
        if !resp.status().is_success() {
            return Ok(Outcome::Skipped(SkipReason::Status(resp.status())));
        }

        // Anything below that returns early leaves the response uncacheable.
        set_no_cache(resp.headers_mut());

        let Some(auth) = req.auth.as_ref() else {
            return Ok(Outcome::NoCache(NoCacheReason::NoAuthContext));
        };

        if req.event.is_transition() {
            tracing::debug!(event = ?req.event, path = %req.full_path, "auth transition");
            self.append_signal(auth, resp.headers_mut());
            return Ok(Outcome::NoCache(NoCacheReason::AuthTransition(req.event)));
        }

        let cookies = req.cookies();
        if let Some(reason) = self.detect_tampering(auth, &cookies) {
            tracing::warn!(path = %req.full_path, %reason, "rejecting suspicious request");
            return Ok(Outcome::Rejected(reason));
        }

        if !self.signal.is_consistent(auth, &cookies) {
            tracing::debug!(path = %req.full_path, "resyncing auth-signal cookie");
            self.append_signal(auth, resp.headers_mut());
            return Ok(Outcome::NoCache(NoCacheReason::AuthSignalResync));
        }

        if !req.is_safe_method() {
            return Ok(Outcome::NoCache(NoCacheReason::UnsafeMethod));
        }

        if resp.headers().contains_key(SET_COOKIE) {
            tracing::warn!(
                path = %req.full_path,
                "response sets a cookie, refusing to cache it"
            );
            return Ok(Outcome::NoCache(NoCacheReason::SetsCookie));
        }

        let decision = self.engine.decide(&req.full_path);

        if decision.is_cacheable() {
            if busting::is_marked(&req.full_path, &config.cache_bust_parameter) {
                return Ok(Outcome::NoCache(NoCacheReason::CacheBusted));
            }
            if req.pending_messages > 0 {
                let location = busting::bust(&req.full_path, &config.cache_bust_parameter);
                tracing::debug!(
                    path = %req.full_path,
                    messages = req.pending_messages,
                    "redirecting around the shared cache"
                );
                return Ok(Outcome::Redirect { location });
            }
        }

        let headers = self.engine.headers_for(&decision, auth, now)?;
        headers.apply_to(resp.headers_mut());

        Ok(Outcome::Applied {
            cacheable: headers.is_cacheable(),
            decision,
        })
    }

    /// A foreign session cookie is always rejected. The auth-signal check
    /// only runs with `enable_tampering_checks`.
    fn detect_tampering(&self, auth: &AuthContext, cookies: &CookieJar) -> Option<TamperReason> {
        if !auth.is_anonymous() {
            return None;
        }

        let session_cookie = &self.engine.config().session_cookie_name;
        if let Some(presented) = cookies.non_empty(session_cookie) {
            // An anonymous session of its own (e.g. one holding messages) is fine.
            let own = auth.session_key.as_ref().map(|key| key.as_str());
            if own != Some(presented) {
                return Some(TamperReason::ForgedSession {
                    cookie: session_cookie.clone(),
                });
            }
        }

        let check_signal = self.engine.config().enable_tampering_checks;
        if check_signal && cookies.non_empty(self.signal.cookie_name()).is_some() {
            return Some(TamperReason::ForgedAuthSignal {
                cookie: self.signal.cookie_name().to_string(),
            });
        }

        None
    }

    fn append_signal(&self, auth: &AuthContext, headers: &mut HeaderMap) {
        let cookie = self.signal.cookie_for(auth);
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(cookie = cookie.name(), error = %e, "invalid auth-signal cookie"),
        }
    }
}

fn set_no_cache(headers: &mut HeaderMap) {
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
}

/// A 302 to `location` that no cache may store.
pub fn redirect_response<B: From<String>>(location: &str) -> GuardResult<Response<B>> {
    let value = HeaderValue::from_str(location)
        .map_err(|_| GuardError::InvalidLocation(location.to_string()))?;

    let mut resp = Response::new(B::from(String::new()));
    *resp.status_mut() = StatusCode::FOUND;
    resp.headers_mut().insert(LOCATION, value);
    set_no_cache(resp.headers_mut());
    Ok(resp)
}

/// A 400 naming the tampering that was detected.
pub fn rejection_response<B: From<String>>(reason: &TamperReason) -> Response<B> {
    let mut resp = Response::new(B::from(reason.message()));
    *resp.status_mut() = StatusCode::BAD_REQUEST;
    set_no_cache(resp.headers_mut());
    resp.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_headers::policy_names;
    use http::Method;

    fn middleware(config: CacheHeadersConfig) -> CacheHeadersMiddleware {
        CacheHeadersMiddleware::from_config(config, PolicyRegistry::with_builtins()).unwrap()
    }

    fn default_middleware() -> CacheHeadersMiddleware {
        middleware(
            CacheHeadersConfig::default()
                .with_rules(policy_names::ANONYMOUS_ONLY, 600, &["^/a/"])
                .with_tampering_checks(true),
        )
    }

    fn ok() -> Response<String> {
        Response::new(String::new())
    }

    fn cache_control(resp: &Response<String>) -> &str {
        resp.headers()[CACHE_CONTROL].to_str().unwrap()
    }

    #[test]
    fn test_skips() {
        let guard = middleware(CacheHeadersConfig::default().with_debug(true));
        let mut resp = ok();
        let outcome = guard.process(&RequestContext::get("/a/"), &mut resp).unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::Debug));
        assert!(resp.headers().is_empty());

        let guard = default_middleware();
        let mut resp = ok();
        resp.headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static("max-age=1"));
        let outcome = guard.process(&RequestContext::get("/a/"), &mut resp).unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::ExplicitCacheControl));
        assert_eq!(cache_control(&resp), "max-age=1");

        let mut resp = ok();
        *resp.status_mut() = StatusCode::NOT_FOUND;
        let req = RequestContext::get("/a/").with_auth(AuthContext::anonymous());
        let outcome = guard.process(&req, &mut resp).unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::Status(StatusCode::NOT_FOUND)));
        assert!(!resp.headers().contains_key(CACHE_CONTROL));
    }

    #[test]
    fn test_no_auth_context() {
        let guard = default_middleware();
        let mut resp = ok();
        let outcome = guard.process(&RequestContext::get("/a/"), &mut resp).unwrap();
        assert_eq!(outcome, Outcome::NoCache(NoCacheReason::NoAuthContext));
        assert_eq!(cache_control(&resp), NO_CACHE);
    }

    #[test]
    fn test_login_sets_signal() {
        let guard = default_middleware();
        let req = RequestContext::new(Method::POST, "/login/")
            .with_auth(AuthContext::authenticated("7"))
            .with_event(AuthEvent::Login);
        let mut resp = ok();
        let outcome = guard.process(&req, &mut resp).unwrap();
        assert_eq!(outcome, Outcome::NoCache(NoCacheReason::AuthTransition(AuthEvent::Login)));
        assert_eq!(cache_control(&resp), NO_CACHE);
        assert_eq!(resp.headers()[SET_COOKIE], "isauthenticated=1; Path=/");
    }

    #[test]
    fn test_logout_removes_signal() {
        let guard = default_middleware();
        let req = RequestContext::get("/logout/")
            .with_auth(AuthContext::anonymous())
            .with_event(AuthEvent::Logout)
            .with_cookie("isauthenticated", "1");
        let mut resp = ok();
        guard.process(&req, &mut resp).unwrap();
        let cookie = resp.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("isauthenticated=; Path=/"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_tampering() {
        let guard = default_middleware();

        let req = RequestContext::get("/a/")
            .with_auth(AuthContext::anonymous())
            .with_cookie("sessionid", "stolen");
        let outcome = guard.process(&req, &mut ok()).unwrap();
        assert!(matches!(outcome, Outcome::Rejected(TamperReason::ForgedSession { .. })));

        let req = RequestContext::get("/a/")
            .with_auth(AuthContext::anonymous())
            .with_cookie("isauthenticated", "1");
        let outcome = guard.process(&req, &mut ok()).unwrap();
        assert!(matches!(outcome, Outcome::Rejected(TamperReason::ForgedAuthSignal { .. })));

        let req = RequestContext::get("/a/")
            .with_auth(AuthContext::anonymous().with_session("mine"))
            .with_cookie("sessionid", "mine");
        let outcome = guard.process(&req, &mut ok()).unwrap();
        assert!(outcome.is_cacheable());
    }

    #[test]
    fn test_foreign_session_rejected_without_tamper_checks() {
        let guard = middleware(
            CacheHeadersConfig::default().with_rules(policy_names::PER_USER, 60, &["^/mine/"]),
        );
        assert!(!guard.engine().config().enable_tampering_checks);

        let req = RequestContext::get("/mine/")
            .with_auth(AuthContext::anonymous())
            .with_cookie("sessionid", "victim-session-key");
        let mut resp = ok();
        let outcome = guard.process(&req, &mut resp).unwrap();
        assert_eq!(
            outcome,
            Outcome::Rejected(TamperReason::ForgedSession {
                cookie: "sessionid".to_string()
            })
        );
        assert_eq!(cache_control(&resp), NO_CACHE);

        let req = RequestContext::get("/mine/")
            .with_auth(AuthContext::anonymous().with_session("mine"))
            .with_cookie("sessionid", "mine");
        let outcome = guard.process(&req, &mut ok()).unwrap();
        assert!(!matches!(outcome, Outcome::Rejected(_)));
    }

    #[test]
    fn test_stale_signal_without_tamper_checks() {
        let guard = middleware(
            CacheHeadersConfig::default().with_rules(policy_names::ANONYMOUS_ONLY, 600, &["^/a/"]),
        );
        let req = RequestContext::get("/a/")
            .with_auth(AuthContext::anonymous())
            .with_cookie("isauthenticated", "1");
        let mut resp = ok();
        let outcome = guard.process(&req, &mut resp).unwrap();
        assert_eq!(outcome, Outcome::NoCache(NoCacheReason::AuthSignalResync));
        assert!(resp.headers()[SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn test_missing_signal_is_reissued() {
        let guard = default_middleware();
        let req = RequestContext::get("/a/").with_auth(AuthContext::authenticated("7"));
        let mut resp = ok();
        let outcome = guard.process(&req, &mut resp).unwrap();
        assert_eq!(outcome, Outcome::NoCache(NoCacheReason::AuthSignalResync));
        assert_eq!(resp.headers()[SET_COOKIE], "isauthenticated=1; Path=/");
        assert_eq!(cache_control(&resp), NO_CACHE);
    }

    #[test]
    fn test_unsafe_method_and_set_cookie() {
        let guard = default_middleware();
        let req = RequestContext::new(Method::POST, "/a/").with_auth(AuthContext::anonymous());
        let outcome = guard.process(&req, &mut ok()).unwrap();
        assert_eq!(outcome, Outcome::NoCache(NoCacheReason::UnsafeMethod));

        let req = RequestContext::new(Method::HEAD, "/a/").with_auth(AuthContext::anonymous());
        assert!(guard.process(&req, &mut ok()).unwrap().is_cacheable());

        let req = RequestContext::get("/a/").with_auth(AuthContext::anonymous());
        let mut resp = ok();
        resp.headers_mut()
            .insert(SET_COOKIE, HeaderValue::from_static("csrftoken=x; Path=/"));
        let outcome = guard.process(&req, &mut resp).unwrap();
        assert_eq!(outcome, Outcome::NoCache(NoCacheReason::SetsCookie));
        assert_eq!(cache_control(&resp), NO_CACHE);
    }

    #[test]
    fn test_pending_messages_redirect() {
        let guard = default_middleware();
        let req = RequestContext::get("/a/?page=2")
            .with_auth(AuthContext::anonymous())
            .with_pending_messages(1);
        let outcome = guard.process(&req, &mut ok()).unwrap();
        let Outcome::Redirect { location } = outcome else {
            panic!("expected redirect, got {:?}", outcome);
        };
        assert!(location.starts_with("/a/?page=2&dch-uuid="));

        let req = RequestContext::get(location)
            .with_auth(AuthContext::anonymous())
            .with_pending_messages(1);
        let outcome = guard.process(&req, &mut ok()).unwrap();
        assert_eq!(outcome, Outcome::NoCache(NoCacheReason::CacheBusted));

        let req = RequestContext::get("/unmapped/")
            .with_auth(AuthContext::anonymous())
            .with_pending_messages(1);
        let outcome = guard.process(&req, &mut ok()).unwrap();
        assert!(matches!(outcome, Outcome::Applied { cacheable: false, .. }));
    }

    #[test]
    fn test_applied() {
        let guard = default_middleware();
        let now = Utc::now();
        let req = RequestContext::get("/a/").with_auth(AuthContext::anonymous());
        let mut resp = ok();
        let outcome = guard.process_at(&req, &mut resp, now).unwrap();
        assert_eq!(
            outcome,
            Outcome::Applied {
                decision: Decision::new(600, policy_names::ANONYMOUS_ONLY),
                cacheable: true,
            }
        );
        assert_eq!(cache_control(&resp), "max-age=5, s-maxage=600");
        assert_eq!(resp.headers()[header_names::X_ACCEL_EXPIRES], "600");
    }

    #[test]
    fn test_respond_builds_replacements() {
        let guard = default_middleware();

        let req = RequestContext::get("/a/")
            .with_auth(AuthContext::anonymous())
            .with_pending_messages(2);
        let resp = guard.respond(&req, ok()).unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert!(resp.headers()[LOCATION].to_str().unwrap().starts_with("/a/?dch-uuid="));
        assert_eq!(cache_control(&resp), NO_CACHE);

        let req = RequestContext::get("/a/")
            .with_auth(AuthContext::anonymous())
            .with_cookie("sessionid", "forged");
        let resp = guard.respond(&req, ok()).unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(resp.body().starts_with("Suspicious request:"));
        assert_eq!(cache_control(&resp), NO_CACHE);
    }

    #[test]
    fn test_invalid_location() {
        let err = redirect_response::<String>("/a/\n").unwrap_err();
        assert_eq!(err, GuardError::InvalidLocation("/a/\n".to_string()));
    }
}

//! The visit bound to a browser's session cookie.
//!
//! The cookie stores nothing but the visit id. Identity and form state stay
//! in the visit registry, so a copied cookie gains no more than the visit it
//! names.

use std::future::{Ready, ready};

use actix_session::{Session, SessionExt};
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use tracing::warn;

use crate::domain::{Error, VisitId};

const VISIT_KEY: &str = "visit_id";

/// Extractor over the session's visit binding.
#[derive(Clone)]
pub struct VisitCookie(Session);

impl VisitCookie {
    /// Point the cookie at `visit`, replacing any earlier binding.
    pub fn bind(&self, visit: VisitId) -> Result<(), Error> {
        self.0
            .insert(VISIT_KEY, visit.to_string())
            .map_err(|err| Error::internal(format!("cannot write session cookie: {err}")))
    }

    /// Bound visit id. Values that do not parse are logged and ignored.
    pub fn visit(&self) -> Result<Option<VisitId>, Error> {
        let stored = self
            .0
            .get::<String>(VISIT_KEY)
            .map_err(|err| Error::internal(format!("cannot read session cookie: {err}")))?;
        Ok(stored.and_then(|raw| {
            raw.parse::<VisitId>()
                .inspect_err(|err| warn!(error = %err, "ignoring malformed visit id in cookie"))
                .ok()
        }))
    }

    /// Bound visit id, or `unauthorized` when there is none.
    pub fn require_visit(&self) -> Result<VisitId, Error> {
        self.visit()?
            .ok_or_else(|| Error::unauthorized("no active visit; open one first"))
    }

    pub fn forget(&self) {
        self.0.remove(VISIT_KEY);
    }
}

impl FromRequest for VisitCookie {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(Self(req.get_session())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{session_cookie, test_session_middleware};
    use actix_web::cookie::Cookie;
    use actix_web::dev::{Service, ServiceResponse};
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test as actix_test, web};

    const VISIT: &str = "6f1c1a5e-8d5b-4c43-9b7e-2f2c5a0d9e11";

    async fn bind(cookie: VisitCookie) -> Result<HttpResponse, Error> {
        cookie.bind(VISIT.parse().expect("visit id"))?;
        Ok(HttpResponse::Ok().finish())
    }

    async fn tamper(session: Session) -> HttpResponse {
        session
            .insert(VISIT_KEY, "not-a-uuid")
            .expect("raw session write");
        HttpResponse::Ok().finish()
    }

    async fn forget(cookie: VisitCookie) -> HttpResponse {
        cookie.forget();
        HttpResponse::Ok().finish()
    }

    async fn whoami(cookie: VisitCookie) -> Result<HttpResponse, Error> {
        Ok(HttpResponse::Ok().body(cookie.require_visit()?.to_string()))
    }

    async fn get(
        app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
        uri: &str,
        cookie: Option<Cookie<'static>>,
    ) -> ServiceResponse {
        let mut req = actix_test::TestRequest::get().uri(uri);
        if let Some(cookie) = cookie {
            req = req.cookie(cookie);
        }
        actix_test::call_service(app, req.to_request()).await
    }

    macro_rules! app {
        () => {
            actix_test::init_service(
                App::new()
                    .wrap(test_session_middleware())
                    .route("/bind", web::get().to(bind))
                    .route("/tamper", web::get().to(tamper))
                    .route("/forget", web::get().to(forget))
                    .route("/whoami", web::get().to(whoami)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn bound_visit_survives_the_round_trip() {
        let app = app!();
        let bound = get(&app, "/bind", None).await;

        let res = get(&app, "/whoami", Some(session_cookie(&bound))).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(res).await, VISIT);
    }

    #[actix_web::test]
    async fn no_cookie_means_no_visit() {
        let app = app!();
        let res = get(&app, "/whoami", None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn malformed_ids_are_ignored() {
        let app = app!();
        let tampered = get(&app, "/tamper", None).await;

        let res = get(&app, "/whoami", Some(session_cookie(&tampered))).await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn forgotten_visits_are_gone() {
        let app = app!();
        let bound = get(&app, "/bind", None).await;
        let forgotten = get(&app, "/forget", Some(session_cookie(&bound))).await;
        let after = forgotten
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .map(|cookie| cookie.into_owned());

        let res = get(&app, "/whoami", after).await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}

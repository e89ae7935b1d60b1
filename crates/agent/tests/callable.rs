use agent::dispatch::{ContactSmsBroadcaster, ResponderNotifier};
use agent::stores::memory::{MemoryStore, RecordingPush, RecordingSms};
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use models::{IncidentRecord, Responder, SmsStatus};
use pretty_assertions::assert_eq;
use serde_json::json;
use tower::ServiceExt;

const JWT_SECRET: &[u8] = b"supersecret";

struct Fixture {
    store: MemoryStore,
    push: RecordingPush,
    sms: RecordingSms,
}

impl Fixture {
    fn new() -> Self {
        let store = MemoryStore::default();
        for (id, services, state, token) in [
            ("r1", vec!["Fire", "Medical"], "CA", Some("tok-1")),
            ("r2", vec!["Fire"], "CA", None),
            ("r3", vec!["Fire"], "CA", Some("tok-3")),
            ("r4", vec!["Fire"], "NV", Some("tok-4")),
        ] {
            store.insert_responder(Responder {
                id: id.to_string(),
                services: services.into_iter().map(str::to_string).collect(),
                state: Some(state.to_string()),
                fcm_token: token.map(str::to_string),
            });
        }
        store.insert_incident(IncidentRecord {
            id: "sos-1".to_string(),
            emergency_type: "Fire".to_string(),
            ..Default::default()
        });

        Self {
            store,
            push: RecordingPush::default(),
            sms: RecordingSms::default(),
        }
    }

    fn router(&self) -> axum::Router {
        agent::api::build_router(
            ResponderNotifier::new(self.store.clone(), self.push.clone()),
            ContactSmsBroadcaster::new(self.store.clone(), self.sms.clone()),
            JWT_SECRET,
        )
    }

    async fn call(
        &self,
        path: &str,
        token: Option<&str>,
        body: String,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::post(path).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = self
            .router()
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }
}

fn token(secret: &[u8]) -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({"sub": "user-1", "aud": "authenticated", "exp": exp}),
        &jsonwebtoken::EncodingKey::from_secret(secret),
    )
    .unwrap()
}

#[tokio::test]
async fn test_notify_responders() {
    let fixture = Fixture::new();
    fixture.push.fail_token("tok-3");

    let (status, body) = fixture
        .call(
            "/v1/notify-responders",
            Some(&token(JWT_SECRET)),
            json!({"data": {
                "reportId": "sos-1",
                "emergencyType": "Fire",
                "latitude": 38.5816,
                "longitude": -121.4944,
                "address": "915 I St",
                "city": "Sacramento",
                "state": "CA"
            }})
            .to_string(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"result": {"success": true, "notifiedCount": 1}}));
    assert_eq!(fixture.push.attempts().len(), 2);
}

#[tokio::test]
async fn test_notify_responders_without_matches() {
    let fixture = Fixture::new();

    let (status, body) = fixture
        .call(
            "/v1/notify-responders",
            Some(&token(JWT_SECRET)),
            json!({"data": {"incidentId": "sos-1", "emergencyType": "Police", "state": "CA"}})
                .to_string(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    insta::assert_json_snapshot!(body, @r###"
    {
      "result": {
        "message": "No matching responders found",
        "notifiedCount": 0,
        "success": false
      }
    }
    "###);
}

#[tokio::test]
async fn test_unauthenticated_callers_are_refused() {
    let fixture = Fixture::new();

    for token in [None, Some(token(b"wrong secret")), Some("not-a-jwt".to_string())] {
        // Even a malformed payload is refused as unauthenticated.
        let (status, body) = fixture
            .call("/v1/send-contact-sms", token.as_deref(), "{".to_string())
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["status"], "UNAUTHENTICATED");
    }
    assert!(fixture.sms.attempts().is_empty());
    assert!(fixture.push.attempts().is_empty());
}

#[tokio::test]
async fn test_send_contact_sms() {
    let fixture = Fixture::new();
    fixture
        .sms
        .fail_number("+15565550100", "number is unreachable");

    let (status, body) = fixture
        .call(
            "/v1/send-contact-sms",
            Some(&token(JWT_SECRET)),
            json!({"data": {
                "reportId": "sos-1",
                "phoneNumbers": ["+15555550100", "+15565550100"],
                "emergencyType": "Fire",
                "userName": "Jane Doe",
                "address": "915 I St",
                "nearestServiceName": "Station 2",
                "nearestServiceDistance": "1.2 km"
            }})
            .to_string(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    insta::assert_json_snapshot!(body, @r###"
    {
      "result": {
        "failedNumbers": {
          "+15565550100": "number is unreachable"
        },
        "messagesSent": 1,
        "success": true,
        "successfulNumbers": [
          "+15555550100"
        ]
      }
    }
    "###);

    let incident = fixture.store.incident("sos-1").unwrap();
    assert_eq!(incident.sms_sent, Some(true));
    assert_eq!(incident.sms_status, Some(SmsStatus::Sent));

    assert_eq!(
        fixture.sms.attempts()[0].body,
        "EMERGENCY ALERT: Jane Doe has reported a Fire emergency.\n\n\
         Location: 915 I St\n\n\
         Nearest Fire: Station 2 (1.2 km)\n\n\
         SOS ID: sos-1 for status tracking.\n\n\
         This is an automated emergency alert. Please contact emergency services if needed."
    );
}

#[tokio::test]
async fn test_invalid_arguments() {
    let fixture = Fixture::new();
    let token = token(JWT_SECRET);

    let (status, body) = fixture
        .call(
            "/v1/send-contact-sms",
            Some(&token),
            json!({"data": {"reportId": "sos-1", "phoneNumbers": []}}).to_string(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"error": {"status": "INVALID_ARGUMENT", "message": "No phone numbers provided"}})
    );

    let (status, body) = fixture
        .call(
            "/v1/send-contact-sms",
            Some(&token),
            json!({"data": {"phoneNumbers": "+15555550100"}}).to_string(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["status"], "INVALID_ARGUMENT");

    assert!(fixture.sms.attempts().is_empty());
    assert!(fixture.store.patches().is_empty());
}

#[tokio::test]
async fn test_directory_failure_is_internal() {
    let fixture = Fixture::new();
    fixture.store.fail_queries();

    let (status, body) = fixture
        .call(
            "/v1/notify-responders",
            Some(&token(JWT_SECRET)),
            json!({"data": {"emergencyType": "Fire"}}).to_string(),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"error": {
            "status": "INTERNAL",
            "message": "querying responder directory: responder directory is unavailable"
        }})
    );
}

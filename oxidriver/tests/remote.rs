//! End-to-end tests of the HTTP dispatcher and session wrappers against a
//! canned-response remote end.

mod support;

use serde_json::{json, Value};

use oxidriver::actions::{key_down, key_up, pointer_down, pointer_up};
use oxidriver::{
    By, ClientConfig, Cookie, DesiredCapabilities, ErrorKind, MouseButton, PointerKind,
    WebDriver, WebDriverError, ELEMENT_KEY,
};
use support::{spawn_remote, Response};

fn driver_for(url: &str) -> WebDriver {
    WebDriver::new(ClientConfig::new(url)).unwrap()
}

fn body_json(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or(Value::Null)
}

#[tokio::test]
async fn find_element_decodes_the_element_reference() {
    let remote = spawn_remote(|req| {
        if req.method == "POST" && req.path == "/session/S/element" {
            Response::json(
                200,
                format!(r#"{{"value":{{"{ELEMENT_KEY}":"E"}}}}"#),
            )
        } else {
            Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#)
        }
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    let element = driver.find_element(By::Id, "myID").await.unwrap();
    assert_eq!(element.id(), "E");

    let requests = remote.recorded();
    assert_eq!(requests.len(), 1);
    let body = body_json(&requests[0].body);
    assert_eq!(body["using"], "css selector");
    assert_eq!(body["value"], "[id=\"myID\"]");
    // Path-substituted parameters stay in the POST body.
    assert_eq!(body["sessionId"], "S");
}

#[tokio::test]
async fn find_elements_preserves_document_order() {
    let remote = spawn_remote(|req| {
        if req.method == "POST" && req.path == "/session/S/elements" {
            Response::json(
                200,
                format!(
                    r#"{{"value":[{{"{ELEMENT_KEY}":"id1"}},{{"{ELEMENT_KEY}":"id2"}}]}}"#
                ),
            )
        } else {
            Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#)
        }
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    let elements = driver.find_elements(By::Name, "myName").await.unwrap();
    let ids: Vec<&str> = elements.iter().map(|e| e.id()).collect();
    assert_eq!(ids, ["id1", "id2"]);
}

#[tokio::test]
async fn add_cookie_posts_the_cookie_envelope() {
    let remote = spawn_remote(|req| {
        if req.method == "POST" && req.path == "/session/S/cookie" {
            Response::json(200, r#"{"value":{}}"#)
        } else {
            Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#)
        }
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    driver.add_cookie(&Cookie::new("k", "v")).await.unwrap();

    let body = body_json(&remote.recorded()[0].body);
    assert_eq!(body["cookie"], json!({"name": "k", "value": "v"}));
}

#[tokio::test]
async fn perform_actions_composes_the_stored_devices() {
    let remote = spawn_remote(|req| {
        if req.method == "POST" && req.path == "/session/S/actions" {
            Response::json(200, r#"{"value":{}}"#)
        } else {
            Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#)
        }
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    driver.store_key_actions("kb", [key_down("A"), key_up("A")]);
    driver.store_pointer_actions(
        "pt",
        PointerKind::Mouse,
        [
            pointer_down(MouseButton::Left),
            pointer_up(MouseButton::Left),
        ],
    );
    driver.perform_actions().await.unwrap();

    let body = body_json(&remote.recorded()[0].body);
    assert_eq!(
        body["actions"],
        json!([
            {
                "type": "key",
                "id": "kb",
                "actions": [
                    {"type": "keyDown", "value": "A"},
                    {"type": "keyUp", "value": "A"},
                ],
            },
            {
                "type": "pointer",
                "id": "pt",
                "parameters": {"pointerType": "mouse"},
                "actions": [
                    {"type": "pointerDown", "button": 0},
                    {"type": "pointerUp", "button": 0},
                ],
            },
        ])
    );

    // The queue is cleared after the flush.
    driver.perform_actions().await.unwrap();
    let body = body_json(&remote.recorded()[1].body);
    assert_eq!(body["actions"], json!([]));
}

#[tokio::test]
async fn key_down_presses_one_action_per_character() {
    let remote = spawn_remote(|req| {
        if req.method == "POST" && req.path == "/session/S/actions" {
            Response::json(200, r#"{"value":{}}"#)
        } else {
            Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#)
        }
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    driver.key_down("abc").await.unwrap();

    let body = body_json(&remote.recorded()[0].body);
    let device = &body["actions"][0];
    assert_eq!(device["type"], "key");
    assert_eq!(device["id"], "default keyboard");
    let values: Vec<&str> = device["actions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| {
            assert_eq!(a["type"], "keyDown");
            a["value"].as_str().unwrap()
        })
        .collect();
    assert_eq!(values, ["a", "b", "c"]);
}

#[tokio::test]
async fn release_actions_is_a_delete() {
    let remote = spawn_remote(|req| {
        if req.method == "DELETE" && req.path == "/session/S/actions" {
            Response::json(200, r#"{"value":{}}"#)
        } else {
            Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#)
        }
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    driver.release_actions().await.unwrap();
}

#[tokio::test]
async fn dismiss_alert_round_trips() {
    let remote = spawn_remote(|req| {
        if req.method == "POST" && req.path == "/session/S/alert/dismiss" {
            Response::json(200, r#"{"value":{}}"#)
        } else {
            Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#)
        }
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    driver.dismiss_alert().await.unwrap();
}

#[tokio::test]
async fn screenshot_decodes_base64() {
    let remote = spawn_remote(|req| {
        if req.method == "GET" && req.path == "/session/S/screenshot" {
            Response::json(200, r#"{"value":"aGVsbG8gd29ybGQ="}"#)
        } else {
            Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#)
        }
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    let bytes = driver.screenshot().await.unwrap();
    assert_eq!(bytes, b"hello world");
}

#[tokio::test]
async fn protocol_errors_surface_kind_message_and_status() {
    let remote = spawn_remote(|_| {
        Response::json(
            404,
            r#"{"value":{"error":"no such element","message":"m","stacktrace":"s"}}"#,
        )
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    let err = driver.find_element(By::Css, "#nope").await.unwrap_err();
    match err {
        WebDriverError::Protocol(protocol) => {
            assert_eq!(protocol.kind, ErrorKind::NoSuchElement);
            assert_eq!(protocol.message, "m");
            assert_eq!(protocol.stacktrace.as_deref(), Some("s"));
            assert_eq!(protocol.http_status, 404);
        }
        other => panic!("expected a protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn value_embedded_errors_count_even_on_200() {
    let remote = spawn_remote(|_| {
        Response::json(
            200,
            r#"{"value":{"error":"stale element reference","message":"gone"}}"#,
        )
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    let err = driver.title().await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::StaleElementReference));
}

#[tokio::test]
async fn dispatched_paths_contain_no_placeholders() {
    let remote = spawn_remote(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/session/S/element") => {
            Response::json(200, format!(r#"{{"value":{{"{ELEMENT_KEY}":"E"}}}}"#))
        }
        ("GET", "/session/S/element/E/attribute/href") => {
            Response::json(200, r#"{"value":"https://example.com"}"#)
        }
        ("GET", "/session/S/element/E/css/color") => {
            Response::json(200, r#"{"value":"rgb(0, 0, 0)"}"#)
        }
        _ => Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#),
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    let element = driver.find_element(By::Css, "a").await.unwrap();
    assert_eq!(
        element.attribute("href").await.unwrap().as_deref(),
        Some("https://example.com")
    );
    assert_eq!(element.css_value("color").await.unwrap(), "rgb(0, 0, 0)");

    let requests = remote.recorded();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| !r.path.contains('$')));
}

#[tokio::test]
async fn non_json_replies_are_transport_errors() {
    let remote = spawn_remote(|_| Response {
        status: 200,
        content_type: "text/html".to_string(),
        body: "<html></html>".to_string(),
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    let err = driver.title().await.unwrap_err();
    match err {
        WebDriverError::NotJson(content_type) => assert!(content_type.contains("text/html")),
        other => panic!("expected NotJson, got {other:?}"),
    }
}

#[tokio::test]
async fn session_lifecycle_binds_and_unbinds() {
    let remote = spawn_remote(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/session") => Response::json(
            200,
            r#"{"value":{"sessionId":"abc","capabilities":{"browserName":"firefox","browserVersion":"101.10.55"}}}"#,
        ),
        ("DELETE", "/session/abc") => Response::json(200, r#"{"value":null}"#),
        _ => Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#),
    })
    .await;

    let driver = driver_for(&remote.url);
    let session_id = driver
        .new_session(&DesiredCapabilities::firefox())
        .await
        .unwrap();
    assert_eq!(session_id, "abc");
    assert_eq!(driver.session_id(), "abc");
    assert_eq!(driver.browser_name(), "firefox");
    assert_eq!(driver.browser_version().unwrap().major, 101);

    // A bound handle refuses a second session.
    let err = driver
        .new_session(&DesiredCapabilities::firefox())
        .await
        .unwrap_err();
    assert!(matches!(err, WebDriverError::SessionExists));

    driver.delete_session().await.unwrap();
    assert_eq!(driver.session_id(), "");
    // Deleting again is a no-op with no wire traffic.
    let before = remote.recorded().len();
    driver.delete_session().await.unwrap();
    assert_eq!(remote.recorded().len(), before);

    // The creation envelope nested the capabilities under alwaysMatch.
    let create = &remote.recorded()[0];
    let body = body_json(&create.body);
    assert_eq!(
        body["capabilities"]["alwaysMatch"]["browserName"],
        "firefox"
    );
}

#[tokio::test]
async fn session_id_is_found_at_the_top_level_too() {
    let remote = spawn_remote(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/session") => {
            Response::json(200, r#"{"sessionId":"top","value":{"capabilities":{}}}"#)
        }
        _ => Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#),
    })
    .await;

    let driver = driver_for(&remote.url);
    let session_id = driver
        .new_session(&DesiredCapabilities::chrome())
        .await
        .unwrap();
    assert_eq!(session_id, "top");
}

#[tokio::test]
async fn failed_session_creation_leaves_the_handle_unbound() {
    let remote = spawn_remote(|_| {
        Response::json(
            500,
            r#"{"value":{"error":"session not created","message":"no browser"}}"#,
        )
    })
    .await;

    let driver = driver_for(&remote.url);
    let err = driver
        .new_session(&DesiredCapabilities::chrome())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::SessionNotCreated));
    assert_eq!(driver.session_id(), "");
}

#[tokio::test]
async fn chrome_cookie_lookup_filters_the_full_jar() {
    let remote = spawn_remote(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/session") => Response::json(
            200,
            r#"{"value":{"sessionId":"abc","capabilities":{"browserName":"chrome"}}}"#,
        ),
        ("GET", "/session/abc/cookie") => Response::json(
            200,
            r#"{"value":[{"name":"other","value":"1"},{"name":"test","value":"123","expiry":1700000000.5}]}"#,
        ),
        _ => Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#),
    })
    .await;

    let driver = driver_for(&remote.url);
    driver
        .new_session(&DesiredCapabilities::chrome())
        .await
        .unwrap();
    let cookie = driver.cookie("test").await.unwrap();
    assert_eq!(cookie.value, "123");
    assert_eq!(cookie.expiry, Some(1700000000));

    // The single-cookie endpoint was never hit.
    assert!(remote
        .recorded()
        .iter()
        .all(|r| r.path != "/session/abc/cookie/test"));
}

#[tokio::test]
async fn element_interactions_hit_element_scoped_paths() {
    let remote = spawn_remote(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/session/S/element") => {
            Response::json(200, format!(r#"{{"value":{{"{ELEMENT_KEY}":"E"}}}}"#))
        }
        ("POST", "/session/S/element/E/click") => Response::json(200, r#"{"value":{}}"#),
        ("POST", "/session/S/element/E/value") => Response::json(200, r#"{"value":{}}"#),
        ("GET", "/session/S/element/E/text") => Response::json(200, r#"{"value":"hi"}"#),
        ("GET", "/session/S/element/E/rect") => {
            Response::json(200, r#"{"value":{"x":10.5,"y":20.0,"width":99.4,"height":200.5}}"#)
        }
        ("GET", "/session/S/element/E/selected") => Response::json(200, r#"{"value":true}"#),
        _ => Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#),
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    let element = driver.find_element(By::Css, "#target").await.unwrap();

    element.click().await.unwrap();
    element.send_keys("ab").await.unwrap();
    assert_eq!(element.text().await.unwrap(), "hi");
    assert_eq!(element.location().await.unwrap(), (11, 20));
    assert_eq!(element.size().await.unwrap(), (99, 201));
    assert!(element.is_selected().await.unwrap());

    // send_keys carried both the whole text and the per-character array.
    let send = remote
        .recorded()
        .into_iter()
        .find(|r| r.path.ends_with("/value"))
        .unwrap();
    let body = body_json(&send.body);
    assert_eq!(body["text"], "ab");
    assert_eq!(body["value"], json!(["a", "b"]));
}

#[tokio::test]
async fn virtual_authenticator_paths_are_id_scoped() {
    let remote = spawn_remote(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/session/S/authenticators") => Response::json(200, r#"{"value":"auth-1"}"#),
        ("POST", "/session/S/authenticators/auth-1/credentials") => {
            Response::json(200, r#"{"value":{}}"#)
        }
        ("GET", "/session/S/authenticators/auth-1/credentials") => {
            Response::json(200, r#"{"value":[{"credentialId":"Y3JlZA=="}]}"#)
        }
        ("DELETE", "/session/S/authenticators/auth-1/credentials/Y3JlZA==") => {
            Response::json(200, r#"{"value":{}}"#)
        }
        ("DELETE", "/session/S/authenticators/auth-1") => Response::json(200, r#"{"value":{}}"#),
        _ => Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#),
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");

    let authenticator_id = driver
        .add_virtual_authenticator(json!({"protocol": "ctap2", "transport": "usb"}))
        .await
        .unwrap();
    assert_eq!(authenticator_id, "auth-1");

    driver
        .add_credential(&authenticator_id, json!({"credentialId": "Y3JlZA=="}))
        .await
        .unwrap();
    let credentials = driver.credentials(&authenticator_id).await.unwrap();
    assert_eq!(credentials.len(), 1);
    driver
        .remove_credential(&authenticator_id, "Y3JlZA==")
        .await
        .unwrap();
    driver
        .remove_virtual_authenticator(&authenticator_id)
        .await
        .unwrap();

    let requests = remote.recorded();
    assert!(requests.iter().all(|r| !r.path.contains('$')));
    // The creation request carried the authenticator options.
    let body = body_json(&requests[0].body);
    assert_eq!(body["protocol"], "ctap2");
}

#[tokio::test]
async fn fedcm_dialog_round_trips() {
    let remote = spawn_remote(|req| match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/session/S/fedcm/gettitle") => {
            Response::json(200, r#"{"value":{"title":"Sign in to example.com"}}"#)
        }
        ("GET", "/session/S/fedcm/getdialogtype") => {
            Response::json(200, r#"{"value":"AccountChooser"}"#)
        }
        ("GET", "/session/S/fedcm/accountlist") => Response::json(
            200,
            r#"{"value":[{"accountId":"a1","email":"u@example.com","loginState":"SignIn"}]}"#,
        ),
        ("POST", "/session/S/fedcm/selectaccount") => Response::json(200, r#"{"value":{}}"#),
        ("DELETE", "/session/S/fedcm/canceldialog") => Response::json(200, r#"{"value":{}}"#),
        _ => Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#),
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");

    assert_eq!(driver.fedcm_title().await.unwrap(), "Sign in to example.com");
    assert_eq!(driver.fedcm_dialog_type().await.unwrap(), "AccountChooser");
    let accounts = driver.fedcm_account_list().await.unwrap();
    assert_eq!(accounts[0]["accountId"], "a1");

    driver.select_fedcm_account(0).await.unwrap();
    driver.cancel_fedcm_dialog().await.unwrap();

    let select = remote
        .recorded()
        .into_iter()
        .find(|r| r.path.ends_with("/selectaccount"))
        .unwrap();
    assert_eq!(body_json(&select.body)["accountIndex"], 0);
}

#[tokio::test]
async fn downloaded_files_decode_their_contents() {
    let remote = spawn_remote(|req| match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/session/S/se/files") => {
            Response::json(200, r#"{"value":{"names":["report.pdf"]}}"#)
        }
        ("POST", "/session/S/se/files") => Response::json(
            200,
            r#"{"value":{"filename":"report.pdf","contents":"aGVsbG8gd29ybGQ="}}"#,
        ),
        _ => Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#),
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");

    assert_eq!(driver.downloadable_files().await.unwrap(), ["report.pdf"]);
    let contents = driver.download_file("report.pdf").await.unwrap();
    assert_eq!(contents, b"hello world");
}

#[tokio::test]
async fn context_switching_round_trips() {
    let remote = spawn_remote(|req| match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/session/S/context") => Response::json(200, r#"{"value":"NATIVE_APP"}"#),
        ("GET", "/session/S/contexts") => {
            Response::json(200, r#"{"value":["NATIVE_APP","WEBVIEW_1"]}"#)
        }
        ("POST", "/session/S/context") => Response::json(200, r#"{"value":{}}"#),
        _ => Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#),
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");

    assert_eq!(driver.current_context().await.unwrap(), "NATIVE_APP");
    assert_eq!(
        driver.contexts().await.unwrap(),
        ["NATIVE_APP", "WEBVIEW_1"]
    );
    driver.switch_to_context("WEBVIEW_1").await.unwrap();

    let switch = remote
        .recorded()
        .into_iter()
        .find(|r| r.method == "POST")
        .unwrap();
    assert_eq!(body_json(&switch.body)["name"], "WEBVIEW_1");
}

#[tokio::test]
async fn execute_script_returns_the_completion_value() {
    let remote = spawn_remote(|req| {
        if req.method == "POST" && req.path == "/session/S/execute/sync" {
            Response::json(200, r#"{"value":42}"#)
        } else {
            Response::json(404, r#"{"value":{"error":"unknown command","message":"?"}}"#)
        }
    })
    .await;

    let driver = driver_for(&remote.url);
    driver.switch_session("S");
    let value = driver
        .execute_script("return 40 + 2;", vec![])
        .await
        .unwrap();
    assert_eq!(value, json!(42));

    let body = body_json(&remote.recorded()[0].body);
    assert_eq!(body["script"], "return 40 + 2;");
    assert_eq!(body["args"], json!([]));
}

#[tokio::test]
async fn unbound_commands_fail_locally() {
    let remote = spawn_remote(|_| Response::json(200, r#"{"value":null}"#)).await;
    let driver = driver_for(&remote.url);
    let err = driver.title().await.unwrap_err();
    assert!(matches!(err, WebDriverError::NoSession));
    assert!(remote.recorded().is_empty());
}

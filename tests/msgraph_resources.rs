use azuread_rs::{AttrValue, DataSourceType, Error, Provider, ResourceData, ResourceType};
use serde_json::json;
use std::collections::BTreeSet;

mod common;
use common::{empty_response, json_response, MockGraph};

const TENANT: &str = "00000000-0000-0000-0000-000000000001";
const APP: &str = "11111111-1111-1111-1111-111111111111";
const KEY: &str = "22222222-2222-2222-2222-222222222222";
const EXISTING: &str = "33333333-3333-3333-3333-333333333333";
const GROUP: &str = "44444444-4444-4444-4444-444444444444";
const USER: &str = "55555555-5555-5555-5555-555555555555";
const ROLE: &str = "66666666-6666-6666-6666-666666666666";
const CLIENT: &str = "77777777-7777-7777-7777-777777777777";

fn provider(mock: &MockGraph) -> Provider {
    Provider::builder(TENANT)
        .enable_msgraph(true)
        .msgraph_endpoint(&mock.base_url)
        .bearer_token("test-token")
        .expect("token")
        .build()
        .expect("provider")
}

fn not_found() -> String {
    json_response(
        "404 Not Found",
        json!({"error": {"code": "Request_ResourceNotFound", "message": "Resource does not exist"}}),
    )
}

#[tokio::test]
async fn application_password_is_appended_without_losing_existing_entries() {
    let existing = json!({"keyId": EXISTING, "displayName": "old", "hint": "abc"});
    let created = json!({
        "keyId": KEY,
        "displayName": "ci",
        "endDateTime": "2030-01-01T00:00:00Z"
    });
    let mut mock = MockGraph::start(vec![
        json_response("200 OK", json!({"id": APP, "passwordCredentials": [existing]})),
        empty_response("204 No Content"),
        json_response(
            "200 OK",
            json!({"id": APP, "passwordCredentials": [existing, created]}),
        ),
    ])
    .await;
    let provider = provider(&mock);

    let mut d = ResourceData::builder(ResourceType::ApplicationPassword.schema())
        .with("application_object_id", APP)
        .with("key_id", KEY)
        .with("value", "s3cr3t")
        .with("description", "ci")
        .with("end_date", "2030-01-01T00:00:00Z")
        .build()
        .expect("config");
    provider
        .create(ResourceType::ApplicationPassword, &mut d)
        .await
        .expect("create");

    assert_eq!(d.id(), format!("{APP}/password/{KEY}"));
    assert_eq!(d.get_str("description"), "ci");
    assert_eq!(d.get_str("end_date"), "2030-01-01T00:00:00Z");

    let requests = mock.requests();
    let lines: Vec<String> = requests.iter().map(|r| r.line()).collect();
    assert_eq!(
        lines,
        vec![
            format!("GET /beta/applications/{APP}"),
            format!("PATCH /beta/applications/{APP}"),
            format!("GET /beta/applications/{APP}"),
        ]
    );
    assert_eq!(
        requests[1].header_value("Authorization"),
        Some("Bearer test-token")
    );
    let body = requests[1].json();
    assert_eq!(body.as_object().expect("object").len(), 1);
    let credentials = body["passwordCredentials"].as_array().expect("array");
    assert_eq!(credentials.len(), 2);
    assert_eq!(credentials[0]["hint"], "abc");
    assert_eq!(credentials[1]["keyId"], KEY);
    assert_eq!(credentials[1]["secretText"], "s3cr3t");
    assert_eq!(credentials[1]["displayName"], "ci");
}

#[tokio::test]
async fn colliding_key_id_is_rejected_without_a_write() {
    let mut mock = MockGraph::start(vec![json_response(
        "200 OK",
        json!({"id": APP, "keyCredentials": [{"keyId": KEY, "type": "AsymmetricX509Cert"}]}),
    )])
    .await;
    let provider = provider(&mock);

    let mut d = ResourceData::builder(ResourceType::ApplicationCertificate.schema())
        .with("application_object_id", APP)
        .with("key_id", KEY)
        .with("value", "MIIC")
        .with("end_date_relative", "8760h")
        .build()
        .expect("config");
    let err = provider
        .create(ResourceType::ApplicationCertificate, &mut d)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));
    assert!(!d.is_tracked());
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn missing_application_fails_create_on_the_parent_attribute() {
    let mut mock = MockGraph::start(vec![not_found()]).await;
    let provider = provider(&mock);

    let mut d = ResourceData::builder(ResourceType::ApplicationPassword.schema())
        .with("application_object_id", APP)
        .with("value", "s3cr3t")
        .with("end_date_relative", "1h")
        .build()
        .expect("config");
    let err = provider
        .create(ResourceType::ApplicationPassword, &mut d)
        .await
        .unwrap_err();
    assert_eq!(err.attribute(), Some("application_object_id"));
    assert!(matches!(err.root(), Error::ParentNotFound { .. }));
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn app_role_delete_disables_then_removes() {
    let role = json!({
        "id": ROLE,
        "allowedMemberTypes": ["User"],
        "description": "Administrators",
        "displayName": "Admin",
        "isEnabled": true,
        "origin": "Application",
        "value": "admin"
    });
    let mut mock = MockGraph::start(vec![
        json_response("200 OK", json!({"id": APP, "appRoles": [role]})),
        empty_response("204 No Content"),
        empty_response("204 No Content"),
    ])
    .await;
    let provider = provider(&mock);

    let d = provider
        .import(ResourceType::ApplicationAppRole, &format!("{APP}/role/{ROLE}"))
        .expect("import");
    provider
        .delete(ResourceType::ApplicationAppRole, &d)
        .await
        .expect("delete");

    let requests = mock.requests();
    assert_eq!(requests.len(), 3);
    let disabled = requests[1].json();
    assert_eq!(disabled["appRoles"][0]["isEnabled"], false);
    assert_eq!(disabled["appRoles"][0]["origin"], "Application");
    assert_eq!(requests[2].json(), json!({"appRoles": []}));
}

#[tokio::test]
async fn group_member_create_follows_pagination_and_posts_ref() {
    let mut mock = MockGraph::start_with(|base| {
        vec![
            json_response(
                "200 OK",
                json!({
                    "value": [{"id": KEY, "@odata.type": "#microsoft.graph.user"}],
                    "@odata.nextLink": format!("{base}/beta/groups/{GROUP}/members?$skiptoken=page2")
                }),
            ),
            json_response("200 OK", json!({"value": []})),
            empty_response("204 No Content"),
            json_response("200 OK", json!({"value": [{"id": KEY}, {"id": USER}]})),
        ]
    })
    .await;
    let provider = provider(&mock);

    let mut d = ResourceData::builder(ResourceType::GroupMember.schema())
        .with("group_object_id", GROUP)
        .with("member_object_id", USER)
        .build()
        .expect("config");
    provider
        .create(ResourceType::GroupMember, &mut d)
        .await
        .expect("create");
    assert_eq!(d.id(), format!("{GROUP}/member/{USER}"));

    let requests = mock.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[1].query_value("$skiptoken"), Some("page2"));
    assert_eq!(
        requests[2].line(),
        format!("POST /beta/groups/{GROUP}/members/$ref")
    );
    assert_eq!(
        requests[2].json(),
        json!({"@odata.id": format!("{}/beta/directoryObjects/{USER}", mock.base_url)})
    );
}

#[tokio::test]
async fn group_owner_delete_of_absent_link_sends_nothing() {
    let mut mock = MockGraph::start(vec![json_response(
        "200 OK",
        json!({"value": [{"id": KEY}]}),
    )])
    .await;
    let provider = provider(&mock);

    let d = provider
        .import(ResourceType::GroupOwner, &format!("{GROUP}/owner/{USER}"))
        .expect("import");
    provider
        .delete(ResourceType::GroupOwner, &d)
        .await
        .expect("delete");
    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].line(), format!("GET /beta/groups/{GROUP}/owners"));
}

#[tokio::test]
async fn service_principal_read_populates_roles_and_gone_object_clears_tracking() {
    let mut mock = MockGraph::start(vec![
        json_response(
            "200 OK",
            json!({
                "id": KEY,
                "appId": APP,
                "displayName": "billing",
                "tags": ["WindowsAzureActiveDirectoryIntegratedApp"],
                "appRoles": [{
                    "id": ROLE,
                    "allowedMemberTypes": ["Application"],
                    "description": "Read all",
                    "displayName": "Reader",
                    "isEnabled": true,
                    "value": "read"
                }]
            }),
        ),
        not_found(),
        not_found(),
    ])
    .await;
    let provider = provider(&mock);

    let mut d = provider
        .import(ResourceType::ServicePrincipal, KEY)
        .expect("import");
    provider
        .read(ResourceType::ServicePrincipal, &mut d)
        .await
        .expect("read");
    assert_eq!(d.get_str("application_id"), APP);
    assert_eq!(d.get_str("object_id"), KEY);
    assert_eq!(d.get_string_set("tags").len(), 1);
    let roles = d.get_blocks("app_roles");
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0]["display_name"], AttrValue::from("Reader"));

    provider
        .read(ResourceType::ServicePrincipal, &mut d)
        .await
        .expect("read gone");
    assert!(!d.is_tracked());

    let d = provider
        .import(ResourceType::ServicePrincipal, KEY)
        .expect("import");
    provider
        .delete(ResourceType::ServicePrincipal, &d)
        .await
        .expect("delete of missing object");
    assert_eq!(mock.requests()[2].line(), format!("DELETE /beta/servicePrincipals/{KEY}"));
}

#[tokio::test]
async fn api_errors_keep_status_and_code() {
    let mut mock = MockGraph::start(vec![json_response(
        "403 Forbidden",
        json!({"error": {"code": "Authorization_RequestDenied", "message": "Insufficient privileges"}}),
    )])
    .await;
    let provider = provider(&mock);

    let mut d = provider
        .import(ResourceType::ApplicationPassword, &format!("{APP}/password/{KEY}"))
        .expect("import");
    let err = provider
        .read(ResourceType::ApplicationPassword, &mut d)
        .await
        .unwrap_err();
    match err.root() {
        Error::Api(api) => {
            assert_eq!(api.status, 403);
            assert_eq!(api.code, "Authorization_RequestDenied");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.attribute(), Some("application_object_id"));
    assert!(d.is_tracked());
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn update_is_unsupported_for_credentials() {
    let mock = MockGraph::start(Vec::new()).await;
    let provider = provider(&mock);
    let mut d = provider
        .import(ResourceType::ServicePrincipalPassword, &format!("{APP}/password/{KEY}"))
        .expect("import");
    let err = provider
        .update(ResourceType::ServicePrincipalPassword, &mut d)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unsupported { operation: "update", .. }));
}

#[tokio::test]
async fn application_data_source_filters_by_client_id_and_lists_owners() {
    let mut mock = MockGraph::start(vec![
        json_response(
            "200 OK",
            json!({"value": [{
                "id": APP,
                "appId": CLIENT,
                "displayName": "billing",
                "identifierUris": ["api://billing"],
                "signInAudience": "AzureADMultipleOrgs",
                "groupMembershipClaims": "SecurityGroup",
                "web": {
                    "homePageUrl": "https://billing.example.com",
                    "logoutUrl": "https://billing.example.com/logout",
                    "redirectUris": ["https://billing.example.com/auth"],
                    "implicitGrantSettings": {"enableAccessTokenIssuance": true}
                },
                "appRoles": [{
                    "id": ROLE,
                    "allowedMemberTypes": ["User"],
                    "description": "Readers",
                    "displayName": "Reader",
                    "isEnabled": true,
                    "value": "read"
                }],
                "requiredResourceAccess": [{
                    "resourceAppId": "00000003-0000-0000-c000-000000000000",
                    "resourceAccess": [{"id": "e1fe6dd8-ba31-4d61-89e7-88639da4683d", "type": "Scope"}]
                }]
            }]}),
        ),
        json_response(
            "200 OK",
            json!({"value": [{"id": USER, "@odata.type": "#microsoft.graph.user"}]}),
        ),
    ])
    .await;
    let provider = provider(&mock);

    let mut d = ResourceData::builder(DataSourceType::Application.schema())
        .with("application_id", CLIENT)
        .build()
        .expect("config");
    provider
        .read_data_source(DataSourceType::Application, &mut d)
        .await
        .expect("read");

    assert_eq!(d.id(), APP);
    assert_eq!(d.get_str("name"), "billing");
    assert_eq!(d.get_str("homepage"), "https://billing.example.com");
    assert_eq!(d.get_str("logout_url"), "https://billing.example.com/logout");
    assert_eq!(d.get_str("type"), "webapp/api");
    assert_eq!(d.get_str("group_membership_claims"), "SecurityGroup");
    assert!(d.get_bool("available_to_other_tenants"));
    assert!(d.get_bool("oauth2_allow_implicit_flow"));
    assert!(d.get_string_set("reply_urls").contains("https://billing.example.com/auth"));
    assert!(d.get_string_set("owners").contains(USER));
    assert_eq!(d.get_blocks("app_roles")[0]["id"], AttrValue::from(ROLE));
    assert_eq!(
        d.get_blocks("required_resource_access")[0]["resource_app_id"],
        AttrValue::from("00000003-0000-0000-c000-000000000000")
    );

    let requests = mock.requests();
    assert_eq!(requests[0].line(), "GET /beta/applications");
    assert_eq!(
        requests[0].query_value("$filter"),
        Some(format!("appId eq '{CLIENT}'").as_str())
    );
    assert_eq!(requests[1].line(), format!("GET /beta/applications/{APP}/owners"));
}

#[tokio::test]
async fn application_data_source_reports_missing_object_on_object_id() {
    let mut mock = MockGraph::start(vec![not_found()]).await;
    let provider = provider(&mock);

    let mut d = ResourceData::builder(DataSourceType::Application.schema())
        .with("object_id", APP)
        .build()
        .expect("config");
    let err = provider
        .read_data_source(DataSourceType::Application, &mut d)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Lookup { attribute: "object_id", .. }));
    assert!(!d.is_tracked());
    assert_eq!(mock.requests()[0].line(), format!("GET /beta/applications/{APP}"));
}

#[tokio::test]
async fn group_data_source_collects_every_page_of_members() {
    let mut mock = MockGraph::start_with(|base| {
        vec![
            json_response(
                "200 OK",
                json!({"value": [{"id": GROUP, "displayName": "O'Brien ops", "description": "Operations"}]}),
            ),
            json_response(
                "200 OK",
                json!({
                    "value": [{"id": KEY}],
                    "@odata.nextLink": format!("{base}/beta/groups/{GROUP}/members?$skiptoken=page2")
                }),
            ),
            json_response("200 OK", json!({"value": [{"id": USER}]})),
            json_response("200 OK", json!({"value": [{"id": USER}]})),
        ]
    })
    .await;
    let provider = provider(&mock);

    let mut d = ResourceData::builder(DataSourceType::Group.schema())
        .with("display_name", "O'Brien ops")
        .build()
        .expect("config");
    provider
        .read_data_source(DataSourceType::Group, &mut d)
        .await
        .expect("read");

    assert_eq!(d.id(), GROUP);
    assert_eq!(d.get_str("description"), "Operations");
    assert_eq!(
        d.get_string_set("members"),
        BTreeSet::from([KEY.to_string(), USER.to_string()])
    );
    assert_eq!(d.get_string_set("owners"), BTreeSet::from([USER.to_string()]));

    let requests = mock.requests();
    let lines: Vec<String> = requests.iter().map(|r| r.line()).collect();
    assert_eq!(
        lines,
        vec![
            "GET /beta/groups".to_string(),
            format!("GET /beta/groups/{GROUP}/members"),
            format!("GET /beta/groups/{GROUP}/members"),
            format!("GET /beta/groups/{GROUP}/owners"),
        ]
    );
    assert_eq!(
        requests[0].query_value("$filter"),
        Some("displayName eq 'O''Brien ops'")
    );
    assert_eq!(requests[2].query_value("$skiptoken"), Some("page2"));
}

#[tokio::test]
async fn group_data_source_rejects_ambiguous_display_name() {
    let mut mock = MockGraph::start(vec![json_response(
        "200 OK",
        json!({"value": [
            {"id": GROUP, "displayName": "ops"},
            {"id": USER, "displayName": "ops"}
        ]}),
    )])
    .await;
    let provider = provider(&mock);

    let mut d = ResourceData::builder(DataSourceType::Group.schema())
        .with("display_name", "ops")
        .build()
        .expect("config");
    let err = provider
        .read_data_source(DataSourceType::Group, &mut d)
        .await
        .unwrap_err();
    assert_eq!(err.attribute(), Some("display_name"));
    assert_eq!(err.to_string(), "found 2 groups with display name \"ops\"");
    assert_eq!(mock.requests().len(), 1);
}

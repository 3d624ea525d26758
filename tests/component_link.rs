//! `compass_component_link` mapper against a mock GraphQL endpoint.

mod common;

use common::{MockCompass, CLOUD_ID};
use compass_provider::resources::{ComponentLinkResource, ComponentLinkState};
use compass_provider::ProviderError;
use serde_json::json;

const COMPONENT: &str = "ari:cloud:compass:cloud-1111:component/abc";

fn planned(name: &str) -> ComponentLinkState {
    ComponentLinkState {
        component_id: COMPONENT.to_string(),
        name: name.to_string(),
        link_type: "REPOSITORY".to_string(),
        url: format!("https://git.example.com/{name}"),
        ..ComponentLinkState::default()
    }
}

fn mock_with_component() -> MockCompass {
    let mock = MockCompass::with_tenant();
    mock.insert_component(COMPONENT, "payments", "service");
    mock
}

#[tokio::test]
async fn test_create_identifies_new_link() {
    common::init_tracing();
    let mock = mock_with_component();
    mock.insert_link(
        COMPONENT,
        json!({"id": "lnk-existing", "name": "docs", "type": "DOCUMENT", "url": "https://docs.example.com", "objectId": null}),
    );
    let resource = ComponentLinkResource::new(mock.tenant_client());

    let state = resource.create(planned("source")).await.unwrap();

    let id = state.id.clone().unwrap();
    assert_ne!(id, "lnk-existing");
    assert_eq!(state.name, "source");
    assert_eq!(state.link_type, "REPOSITORY");
    assert_eq!(state.url, "https://git.example.com/source");
    assert_eq!(state.object_id, None);
    assert_eq!(state.cloud_id.as_deref(), Some(CLOUD_ID));

    let create = mock
        .requests()
        .into_iter()
        .find(|r| r.query().contains("createComponentLink("))
        .unwrap();
    assert_eq!(
        create.body["variables"]["input"],
        json!({
            "componentId": COMPONENT,
            "link": {"name": "source", "type": "REPOSITORY", "url": "https://git.example.com/source"}
        })
    );
}

#[tokio::test]
async fn test_create_disambiguates_by_object_id() {
    let mock = mock_with_component();
    mock.insert_link(
        COMPONENT,
        json!({"id": "lnk-a", "name": "source", "type": "REPOSITORY", "url": "https://git.example.com/source", "objectId": "repo-a"}),
    );
    let resource = ComponentLinkResource::new(mock.tenant_client());

    let state = resource
        .create(ComponentLinkState {
            object_id: Some("repo-b".to_string()),
            ..planned("source")
        })
        .await
        .unwrap();

    assert_ne!(state.id.as_deref(), Some("lnk-a"));
    assert_eq!(state.object_id.as_deref(), Some("repo-b"));
}

#[tokio::test]
async fn test_create_with_duplicate_matches_is_ambiguous() {
    let mock = mock_with_component();
    mock.duplicate_next_link();
    let resource = ComponentLinkResource::new(mock.tenant_client());

    let err = resource.create(planned("source")).await.unwrap_err();
    assert!(matches!(err, ProviderError::AmbiguousCreate(ref msg) if msg.contains("2 listed links")));
    assert_eq!(mock.links(COMPONENT).len(), 2);
}

#[tokio::test]
async fn test_create_without_match_is_ambiguous() {
    let mock = mock_with_component();
    mock.hide_next_link();
    let resource = ComponentLinkResource::new(mock.tenant_client());

    let err = resource.create(planned("source")).await.unwrap_err();
    assert!(matches!(err, ProviderError::AmbiguousCreate(_)));
}

#[tokio::test]
async fn test_create_rejects_unknown_type_before_request() {
    let mock = mock_with_component();
    let resource = ComponentLinkResource::new(mock.tenant_client());

    let err = resource
        .create(ComponentLinkState {
            link_type: "WIKI".to_string(),
            ..planned("source")
        })
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_create_on_missing_component_fails() {
    let mock = MockCompass::with_tenant();
    let resource = ComponentLinkResource::new(mock.tenant_client());

    let err = resource.create(planned("source")).await.unwrap_err();
    assert!(matches!(err, ProviderError::GraphQl(ref msg) if msg.contains("Component not found")));
}

#[tokio::test]
async fn test_read_after_component_deleted_is_gone() {
    let mock = mock_with_component();
    let resource = ComponentLinkResource::new(mock.tenant_client());
    let state = resource.create(planned("source")).await.unwrap();

    mock.remove_component(COMPONENT);
    assert!(resource.read(state).await.unwrap().is_none());
}

#[tokio::test]
async fn test_import_fills_cloud_id_from_tenant() {
    let mock = mock_with_component();
    mock.insert_link(
        COMPONENT,
        json!({"id": "lnk-1", "name": "docs", "type": "DOCUMENT", "url": "https://docs.example.com", "objectId": ""}),
    );
    let resource = ComponentLinkResource::new(mock.tenant_client());

    let state = resource.import(&format!("{COMPONENT}:lnk-1")).await.unwrap();

    assert_eq!(state.name, "docs");
    assert_eq!(state.link_type, "DOCUMENT");
    assert_eq!(state.object_id, None);
    assert_eq!(state.cloud_id.as_deref(), Some(CLOUD_ID));
    assert_eq!(mock.count_queries("tenantContexts("), 1);
}

#[tokio::test]
async fn test_read_never_looks_up_tenant() {
    let mock = mock_with_component();
    mock.insert_link(
        COMPONENT,
        json!({"id": "lnk-1", "name": "docs", "type": "DOCUMENT", "url": "https://docs.example.com"}),
    );
    let resource = ComponentLinkResource::new(mock.tenant_client());

    let state = resource
        .read(ComponentLinkState {
            id: Some("lnk-1".to_string()),
            component_id: COMPONENT.to_string(),
            ..ComponentLinkState::default()
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.cloud_id, None);
    assert_eq!(mock.count_queries("tenantContexts("), 0);
}

#[tokio::test]
async fn test_import_without_tenant_leaves_cloud_id_unset() {
    let mock = MockCompass::start();
    mock.insert_component(COMPONENT, "payments", "service");
    mock.insert_link(
        COMPONENT,
        json!({"id": "lnk-1", "name": "docs", "type": "DOCUMENT", "url": "https://docs.example.com"}),
    );
    let resource = ComponentLinkResource::new(mock.client());

    let state = resource.import(&format!("{COMPONENT}/lnk-1")).await.unwrap();
    assert_eq!(state.cloud_id, None);
    assert_eq!(mock.count_queries("tenantContexts("), 0);
}

#[tokio::test]
async fn test_read_query_error_is_reported() {
    let mock = mock_with_component();
    mock.insert_link(
        COMPONENT,
        json!({"id": "lnk-1", "name": "docs", "type": "DOCUMENT", "url": "https://docs.example.com"}),
    );
    mock.deny_component(COMPONENT);
    let resource = ComponentLinkResource::new(mock.tenant_client());

    let err = resource
        .read(ComponentLinkState {
            id: Some("lnk-1".to_string()),
            component_id: COMPONENT.to_string(),
            cloud_id: Some(CLOUD_ID.to_string()),
            ..ComponentLinkState::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::GraphQl(ref msg) if msg.contains("Forbidden")));
    assert_eq!(mock.links(COMPONENT).len(), 1);
}

#[tokio::test]
async fn test_create_without_object_id_skips_tagged_twin() {
    let mock = mock_with_component();
    mock.insert_link(
        COMPONENT,
        json!({"id": "lnk-tagged", "name": "source", "type": "REPOSITORY", "url": "https://git.example.com/source", "objectId": "repo-a"}),
    );
    let resource = ComponentLinkResource::new(mock.tenant_client());

    let state = resource.create(planned("source")).await.unwrap();

    assert_ne!(state.id.as_deref(), Some("lnk-tagged"));
    assert_eq!(state.object_id, None);
    assert_eq!(mock.links(COMPONENT).len(), 2);
}

#[tokio::test]
async fn test_update_with_empty_cloud_id_keeps_detected_one() {
    let mock = mock_with_component();
    let resource = ComponentLinkResource::new(mock.tenant_client());
    let config = ComponentLinkState {
        cloud_id: Some(String::new()),
        ..planned("source")
    };
    let prior = resource.create(config.clone()).await.unwrap();
    assert_eq!(prior.cloud_id.as_deref(), Some(CLOUD_ID));

    let updated = resource
        .update(
            prior.clone(),
            ComponentLinkState {
                id: prior.id.clone(),
                ..config
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.cloud_id.as_deref(), Some(CLOUD_ID));
    assert_eq!(mock.count_queries("updateComponentLink("), 0);
}

#[tokio::test]
async fn test_update_clears_object_id() {
    let mock = mock_with_component();
    let resource = ComponentLinkResource::new(mock.tenant_client());
    let prior = resource
        .create(ComponentLinkState {
            object_id: Some("repo-1".to_string()),
            ..planned("source")
        })
        .await
        .unwrap();
    let id = prior.id.clone().unwrap();

    let updated = resource
        .update(
            prior.clone(),
            ComponentLinkState {
                url: "https://git.example.com/moved".to_string(),
                object_id: None,
                ..prior.clone()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.url, "https://git.example.com/moved");
    assert_eq!(updated.object_id, None);
    assert_eq!(updated.cloud_id.as_deref(), Some(CLOUD_ID));

    let update = mock
        .requests()
        .into_iter()
        .find(|r| r.query().contains("updateComponentLink("))
        .unwrap();
    assert_eq!(
        update.body["variables"]["input"],
        json!({
            "componentId": COMPONENT,
            "link": {"id": id, "url": "https://git.example.com/moved", "objectId": null}
        })
    );
}

#[tokio::test]
async fn test_update_without_changes_only_reads() {
    let mock = mock_with_component();
    let resource = ComponentLinkResource::new(mock.tenant_client());
    let prior = resource.create(planned("source")).await.unwrap();

    let updated = resource.update(prior.clone(), prior.clone()).await.unwrap();
    assert_eq!(updated, prior);
    assert_eq!(mock.count_queries("updateComponentLink("), 0);
}

#[tokio::test]
async fn test_update_rejects_component_change() {
    let mock = mock_with_component();
    let resource = ComponentLinkResource::new(mock.tenant_client());
    let prior = resource.create(planned("source")).await.unwrap();
    let before = mock.request_count();

    let err = resource
        .update(
            prior.clone(),
            ComponentLinkState {
                component_id: "cmp-other".to_string(),
                ..prior.clone()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(mock.request_count(), before);
}

#[tokio::test]
async fn test_update_validates_new_type() {
    let mock = mock_with_component();
    let resource = ComponentLinkResource::new(mock.tenant_client());
    let prior = resource.create(planned("source")).await.unwrap();
    let before = mock.request_count();

    let err = resource
        .update(
            prior.clone(),
            ComponentLinkState {
                link_type: "WIKI".to_string(),
                ..prior.clone()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(mock.request_count(), before);

    let updated = resource
        .update(
            prior.clone(),
            ComponentLinkState {
                link_type: "DASHBOARD".to_string(),
                ..prior
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.link_type, "DASHBOARD");
}

#[tokio::test]
async fn test_delete_removes_link() {
    let mock = mock_with_component();
    let resource = ComponentLinkResource::new(mock.tenant_client());
    let state = resource.create(planned("source")).await.unwrap();

    resource.delete(state.clone()).await.unwrap();
    assert!(mock.links(COMPONENT).is_empty());
    assert_eq!(
        mock.last_request().body["variables"]["input"],
        json!({"componentId": COMPONENT, "link": state.id.clone().unwrap()})
    );
    assert!(resource.read(state).await.unwrap().is_none());
}

#[tokio::test]
async fn test_import_with_either_separator() {
    let mock = mock_with_component();
    mock.insert_link(
        COMPONENT,
        json!({"id": "lnk-1", "name": "docs", "type": "DOCUMENT", "url": "https://docs.example.com", "objectId": null}),
    );
    let resource = ComponentLinkResource::new(mock.client());

    for import_id in [format!("{COMPONENT}:lnk-1"), format!("{COMPONENT}/lnk-1")] {
        let state = resource.import(&import_id).await.unwrap();
        assert_eq!(state.id.as_deref(), Some("lnk-1"));
        assert_eq!(state.component_id, COMPONENT);
        assert_eq!(state.name, "docs");
    }
}

#[tokio::test]
async fn test_import_errors() {
    let mock = mock_with_component();
    let resource = ComponentLinkResource::new(mock.client());

    let err = resource.import("no-separator").await.unwrap_err();
    assert!(err.is_validation());
    let err = resource.import(&format!("{COMPONENT}:")).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(mock.request_count(), 0);

    let err = resource
        .import(&format!("{COMPONENT}:lnk-missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)));
}

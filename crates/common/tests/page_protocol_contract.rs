use folio_common::protocol::pages::{ListPagesResponse, ReorderPagesRequest};
use folio_common::protocol::routes;
use folio_common::types::{PageDocument, PageId, WorkspaceId};

fn sample_list() -> serde_json::Value {
    serde_json::json!({
        "pages": [
            {
                "id": "a",
                "parent_id": null,
                "depth": 0,
                "position": 0,
                "deleted_at": null,
                "title": "Alpha",
                "icon": "📄",
                "updated_at": "2026-03-01T10:00:00Z"
            },
            {
                "id": "x",
                "parent_id": "a",
                "depth": 1,
                "position": 0,
                "deleted_at": null,
                "title": "Child",
                "icon": null,
                "updated_at": "2026-03-01T10:00:05Z"
            }
        ]
    })
}

#[test]
fn list_response_decodes_structural_fields() {
    let resp: ListPagesResponse =
        serde_json::from_value(sample_list()).expect("list payload should decode");
    assert_eq!(resp.pages.len(), 2);

    let child = &resp.pages[1];
    assert_eq!(child.parent_id, Some(PageId::from("a")));
    assert_eq!(child.depth, 1);
    assert_eq!(child.position, 0);
    assert!(!child.is_trashed());
}

#[test]
fn reorder_request_wire_shape() {
    let body = ReorderPagesRequest {
        parent_id: Some(PageId::from("a")),
        ordered_page_ids: vec![PageId::from("c"), PageId::from("b")],
    };
    let value = serde_json::to_value(&body).expect("reorder body should encode");
    assert_eq!(
        value,
        serde_json::json!({ "parent_id": "a", "ordered_page_ids": ["c", "b"] })
    );
}

#[test]
fn get_page_payload_decodes_with_content() {
    let payload = serde_json::json!({
        "id": "a",
        "parent_id": null,
        "depth": 0,
        "position": 0,
        "deleted_at": null,
        "title": "Alpha",
        "icon": null,
        "cover": "https://img.example/cover.png",
        "updated_at": "2026-03-01T10:00:00Z",
        "content": { "blocks": [] }
    });
    let doc: PageDocument = serde_json::from_value(payload).expect("document should decode");
    assert_eq!(doc.id().as_str(), "a");
    assert_eq!(doc.cover.as_deref(), Some("https://img.example/cover.png"));
    assert_eq!(doc.content["blocks"], serde_json::json!([]));
}

#[test]
fn routes_are_stable() {
    assert_eq!(routes::workspace_pages(&WorkspaceId::from("w")), "/api/workspaces/w/pages");
    assert_eq!(routes::page(&PageId::from("p")), "/api/pages/p");
    assert_eq!(routes::REORDER_PAGES, "/api/pages/reorder");
}

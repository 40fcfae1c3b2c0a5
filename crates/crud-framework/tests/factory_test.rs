use crud_framework::{
    callback, error_hook, Actions, CrudFactory, Dispatchers, FactoryDefaults, IncludeAction, Key,
    Method, MockTransport, NameMode, OperationError, OperationOptions, Outcome, OwnProps,
    ParentKey, ResourceConfig, ResourceHook, Route, StateError, StoreActor, StoreError, StoreState,
    TransportError, VerbConfig,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn start(factory: CrudFactory) -> Dispatchers {
    let (store, dispatchers) = factory.build().expect("valid configuration");
    tokio::spawn(store.run());
    dispatchers
}

async fn wait_until(dispatchers: &Dispatchers, ready: impl Fn(&StoreState) -> bool) {
    let mut snapshots = dispatchers.store().subscribe();
    snapshots
        .wait_for(|state| ready(state))
        .await
        .expect("store stopped");
}

fn list_of(state: &StoreState, resource: &str, parent: Option<&ParentKey>) -> Vec<Value> {
    state
        .list(resource, parent)
        .expect("registered")
        .map(|list| list.values().cloned().collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_items_end_to_end() {
    let mock = MockTransport::new();
    let release = mock.expect_get("/api/items/").respond_later();
    mock.expect_post("/api/items/").return_ok(json!({"id": 2, "name": "b"}));
    mock.expect_delete("/api/items/1/").return_ok(Value::Null);

    let dispatchers = start(CrudFactory::builder(FactoryDefaults::new(mock.shared())).resource(
        "items",
        ResourceConfig::new("/api/items/")
            .actions(Actions::default().get_list(true).create(true).delete(true)),
    ));
    let items = dispatchers.resource("items").unwrap();

    let pending = tokio::spawn({
        let items = items.clone();
        async move { items.get_list(OperationOptions::new()).await }
    });
    wait_until(&dispatchers, |s| s.is_loading("items", "getList", None).unwrap()).await;

    release.send(Ok(json!([{"id": 1, "name": "a"}]))).unwrap();
    let outcome = pending.await.unwrap().unwrap();
    assert!(outcome.is_success());

    let state = dispatchers.state().await.unwrap();
    assert!(!state.is_loading("items", "getList", None).unwrap());
    assert_eq!(list_of(&state, "items", None), vec![json!({"id": 1, "name": "a"})]);

    items.create(json!({"name": "b"}), OperationOptions::new()).await.unwrap();
    let state = dispatchers.state().await.unwrap();
    assert_eq!(list_of(&state, "items", None).len(), 2);

    items.delete(json!({"id": 1}), OperationOptions::new()).await.unwrap();
    let state = dispatchers.state().await.unwrap();
    assert_eq!(list_of(&state, "items", None), vec![json!({"id": 2, "name": "b"})]);

    mock.verify();
}

#[tokio::test]
async fn test_duplicate_call_is_skipped() {
    let mock = MockTransport::new();
    let release = mock.expect_get("/api/items/").respond_later();

    let dispatchers = start(
        CrudFactory::builder(FactoryDefaults::new(mock.shared()))
            .resource("items", ResourceConfig::new("/api/items/")),
    );
    let items = dispatchers.resource("items").unwrap();

    let first = tokio::spawn({
        let items = items.clone();
        async move { items.get_list(OperationOptions::new()).await }
    });
    wait_until(&dispatchers, |s| s.is_loading("items", "getList", None).unwrap()).await;

    let second = items.get_list(OperationOptions::new()).await.unwrap();
    assert_eq!(second, Outcome::Skipped);

    release.send(Ok(json!([]))).unwrap();
    assert!(first.await.unwrap().unwrap().is_success());
    assert_eq!(mock.call_count(), 1);
    mock.verify();
}

#[tokio::test]
async fn test_transport_error_is_stored_and_hooks_run_in_order() {
    let mock = MockTransport::new();
    mock.expect_get("/api/users/").return_err(TransportError::status(500, "boom"));

    let order = Arc::new(Mutex::new(Vec::new()));
    let hook = |tag: &'static str| {
        let order = order.clone();
        error_hook(move |_| order.lock().unwrap().push(tag))
    };

    let defaults = FactoryDefaults::new(mock.shared()).on_error(hook("global"));
    let dispatchers = start(CrudFactory::builder(defaults).resource(
        "users",
        ResourceConfig::new("/api/users/")
            .actions(Actions::default().get_list(VerbConfig::enabled().on_error(hook("verb")))),
    ));
    let users = dispatchers.resource("users").unwrap();

    let outcome = users
        .get_list(OperationOptions::new().on_error(hook("caller")))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Failed(TransportError::status(500, "boom")));
    assert_eq!(*order.lock().unwrap(), vec!["global", "verb", "caller"]);

    let state = dispatchers.state().await.unwrap();
    assert!(!state.is_loading("users", "getList", None).unwrap());
    assert_eq!(
        state.error("users", "getList", None).unwrap(),
        Some(&TransportError::status(500, "boom"))
    );

    users.clear_error("getList", None).await.unwrap();
    let state = dispatchers.state().await.unwrap();
    assert_eq!(state.error("users", "getList", None).unwrap(), None);
}

#[tokio::test]
async fn test_update_moves_entity_to_new_key() {
    let mock = MockTransport::new();
    mock.expect_patch("/api/pages/1/")
        .return_ok(json!({"id": 1, "slug": "new", "title": "Renamed"}));

    let dispatchers = start(CrudFactory::builder(FactoryDefaults::new(mock.shared())).resource(
        "pages",
        ResourceConfig::new("/api/pages/").by_key("slug"),
    ));
    let pages = dispatchers.resource("pages").unwrap();
    pages
        .set_list(json!([{"id": 1, "slug": "old", "title": "Page"}]), None)
        .await
        .unwrap();

    pages
        .update(
            json!({"id": 1, "slug": "new"}),
            OperationOptions::new().original(json!({"id": 1, "slug": "old", "title": "Page"})),
        )
        .await
        .unwrap();

    let state = dispatchers.state().await.unwrap();
    let list = state.list("pages", None).unwrap().unwrap();
    assert_eq!(list.len(), 1);
    assert!(list.get(&Key::from("old")).is_none());
    assert_eq!(list[&Key::from("new")]["title"], json!("Renamed"));
}

#[tokio::test]
async fn test_nested_get_all_and_parent_change() {
    let mock = MockTransport::new();
    mock.expect_get("/api/items/").return_ok(json!([
        {"id": 1, "categoryId": "A"},
        {"id": 2, "categoryId": "B"}
    ]));
    mock.expect_patch("/api/items/1/")
        .return_ok(json!({"id": 1, "categoryId": "B"}));

    let dispatchers = start(CrudFactory::builder(FactoryDefaults::new(mock.shared())).resource(
        "items",
        ResourceConfig::new("/api/items/").parent("categoryId"),
    ));
    let items = dispatchers.resource("items").unwrap();

    items.get_all(OperationOptions::new()).await.unwrap();
    let state = dispatchers.state().await.unwrap();
    let a = ParentKey::from("A");
    let b = ParentKey::from("B");
    assert_eq!(list_of(&state, "items", Some(&a)), vec![json!({"id": 1, "categoryId": "A"})]);
    assert_eq!(list_of(&state, "items", Some(&b)), vec![json!({"id": 2, "categoryId": "B"})]);
    assert!(!state.is_loading("items", "getAll", None).unwrap());

    items
        .update(
            json!({"id": 1, "categoryId": "B"}),
            OperationOptions::new().original(json!({"id": 1, "categoryId": "A"})),
        )
        .await
        .unwrap();

    let state = dispatchers.state().await.unwrap();
    assert!(list_of(&state, "items", Some(&a)).is_empty());
    assert_eq!(list_of(&state, "items", Some(&b)).len(), 2);
    mock.verify();
}

#[tokio::test]
async fn test_callback_reaches_other_resource() {
    let mock = MockTransport::new();
    mock.expect_post("/api/items/").return_ok(json!({"id": 5, "categoryId": 7}));
    mock.expect_get("/api/categories/7/").return_ok(json!({"id": 7, "itemCount": 1}));

    let refresh_category = callback(|item: Value, dispatchers: Dispatchers| async move {
        let categories = dispatchers.resource("categories").unwrap();
        categories
            .get(item["categoryId"].clone(), OperationOptions::new())
            .await
            .unwrap();
    });

    let dispatchers = start(
        CrudFactory::builder(FactoryDefaults::new(mock.shared()))
            .resource("categories", ResourceConfig::new("/api/categories/"))
            .resource(
                "items",
                ResourceConfig::new("/api/items/").actions(
                    Actions::default()
                        .get_list(true)
                        .create(VerbConfig::enabled().callback(refresh_category)),
                ),
            ),
    );

    dispatchers
        .resource("items")
        .unwrap()
        .create(json!({"categoryId": 7}), OperationOptions::new())
        .await
        .unwrap();

    let state = dispatchers.state().await.unwrap();
    assert_eq!(list_of(&state, "categories", None), vec![json!({"id": 7, "itemCount": 1})]);
    mock.verify();
}

#[tokio::test]
async fn test_included_actions() {
    let mock = MockTransport::new();
    mock.expect_post("/api/users/3/archive/").return_ok(json!({"archived": 1}));

    let archive = IncludeAction::new(Route::dynamic(|input, _| format!("/api/users/{}/archive/", input["id"])))
        .method(Method::Post)
        .on_response(callback(|data: Value, dispatchers: Dispatchers| async move {
            let users = dispatchers.resource("users").unwrap();
            users.set_state("archivedCount", data["archived"].clone(), None).await.unwrap();
        }));

    let dispatchers = start(
        CrudFactory::builder(FactoryDefaults::new(mock.shared())).resource(
            "users",
            ResourceConfig::new("/api/users/")
                .actions(Actions::default().get_list(true))
                .include_action("archive", archive)
                .include_action("touch", IncludeAction::sync())
                .state("archivedCount", json!(0)),
        ),
    );
    let users = dispatchers.resource("users").unwrap();

    let outcome = users
        .call_included("archive", json!({"id": 3}), OperationOptions::new())
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Succeeded(json!({"archived": 1})));

    let outcome = users
        .call_included("touch", json!({"id": 3}), OperationOptions::new())
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Dispatched);

    let state = dispatchers.state().await.unwrap();
    let tree = state.resource("users").unwrap();
    assert_eq!(tree.custom_state(None).unwrap()["archivedCount"], json!(1));
    assert!(!state.is_loading("users", "archive", None).unwrap());

    let err = users
        .call_included("missing", Value::Null, OperationOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OperationError::Config(_)));
    mock.verify();
}

#[tokio::test]
async fn test_unregistered_reducer_is_a_wiring_error() {
    let mock = MockTransport::new();
    let mut parts = CrudFactory::builder(FactoryDefaults::new(mock.shared()))
        .resource("users", ResourceConfig::new("/api/users/"))
        .into_parts()
        .unwrap();
    assert_eq!(parts.take_reducers().len(), 1);

    let (store, client) = StoreActor::new(8, Vec::new());
    tokio::spawn(store.run());
    let dispatchers = parts.connect(client);

    let err = dispatchers
        .resource("users")
        .unwrap()
        .get_list(OperationOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OperationError::Store(StoreError::State(StateError::Unregistered(ref name))) if name == "users"
    ));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_hook_binds_props_and_operations() {
    let mock = MockTransport::new();
    mock.expect_delete("/api/items/1/").return_ok(Value::Null);

    let dispatchers = start(CrudFactory::builder(FactoryDefaults::new(mock.shared())).resource(
        "items",
        ResourceConfig::new("/api/items/")
            .parent("categoryId")
            .actions(Actions::default().get_list(true).delete(true).single_select()),
    ));
    let items = dispatchers.resource("items").unwrap();
    items
        .set_all(json!([
            {"id": 1, "categoryId": "A", "name": "one"},
            {"id": 2, "categoryId": "A", "name": "two"}
        ]))
        .await
        .unwrap();
    items.select(json!({"id": 2, "categoryId": "A"}), None).await.unwrap();
    dispatchers.state().await.unwrap();

    let hook = ResourceHook::new(items.clone());
    let output = hook
        .use_props(OwnProps::new().id(1).parent("A"), NameMode::Stripped)
        .unwrap();
    assert_eq!(output.prop("list").unwrap().as_object().unwrap().len(), 2);
    assert_eq!(output.prop("item").unwrap()["name"], json!("one"));
    assert_eq!(output.prop("selectedId"), Some(&json!(2)));
    assert_eq!(output.prop("selected").unwrap()["name"], json!("two"));
    assert_eq!(output.prop("getListIsLoading"), Some(&json!(false)));

    let delete = output.operation("delete").unwrap();
    assert!(!delete.is_loading);
    delete.call(Value::Null, OperationOptions::new()).await.unwrap();

    let state = dispatchers.state().await.unwrap();
    let a = ParentKey::from("A");
    assert_eq!(list_of(&state, "items", Some(&a)).len(), 1);

    let full = hook.use_props(OwnProps::new(), NameMode::Full).unwrap();
    assert!(full.operation("deleteItem").is_some());
    assert_eq!(full.prop("itemsList").unwrap()["A"].as_object().unwrap().len(), 1);
    mock.verify();
}

fn pages(mock: &MockTransport) -> Dispatchers {
    start(CrudFactory::builder(FactoryDefaults::new(mock.shared())).resource(
        "pages",
        ResourceConfig::new("/api/pages/").by_key("slug"),
    ))
}

#[tokio::test]
async fn test_update_without_original_replaces_old_key() {
    let mock = MockTransport::new();
    mock.expect_patch("/api/pages/1/").return_ok(json!({"id": 1, "slug": "new"}));

    let dispatchers = pages(&mock);
    let pages = dispatchers.resource("pages").unwrap();
    pages
        .set_list(json!([{"id": 1, "slug": "old", "title": "T"}]), None)
        .await
        .unwrap();

    pages
        .update(json!({"id": 1, "slug": "new"}), OperationOptions::new())
        .await
        .unwrap();

    let state = dispatchers.state().await.unwrap();
    let list = state.list("pages", None).unwrap().unwrap();
    assert_eq!(list.keys().cloned().collect::<Vec<_>>(), vec![Key::from("new")]);
    assert_eq!(list[&Key::from("new")]["title"], json!("T"));
    mock.verify();
}

#[tokio::test]
async fn test_hook_resolves_id_from_list_key() {
    let mock = MockTransport::new();
    mock.expect_patch("/api/pages/1/").return_ok(json!({"id": 1, "slug": "renamed"}));
    mock.expect_delete("/api/pages/2/").return_ok(Value::Null);

    let dispatchers = pages(&mock);
    let pages = dispatchers.resource("pages").unwrap();
    pages
        .set_list(json!([{"id": 1, "slug": "a"}, {"id": 2, "slug": "b"}]), None)
        .await
        .unwrap();
    dispatchers.state().await.unwrap();

    let hook = ResourceHook::new(pages.clone());
    let output = hook.use_props(OwnProps::new().id("a"), NameMode::Stripped).unwrap();
    let outcome = output
        .operation("update")
        .unwrap()
        .call(json!({"slug": "renamed"}), OperationOptions::new())
        .await
        .unwrap();
    assert!(outcome.is_success());

    let output = hook.use_props(OwnProps::new(), NameMode::Stripped).unwrap();
    output
        .operation("delete")
        .unwrap()
        .call(json!("b"), OperationOptions::new())
        .await
        .unwrap();

    let state = dispatchers.state().await.unwrap();
    let list = state.list("pages", None).unwrap().unwrap();
    assert_eq!(list.keys().cloned().collect::<Vec<_>>(), vec![Key::from("renamed")]);
    mock.verify();
}

#[tokio::test]
async fn test_success_without_entity_still_settles() {
    let mock = MockTransport::new();
    mock.expect_patch("/api/pages/1/").return_ok(Value::Null);
    mock.expect_patch("/api/pages/1/").return_ok(Value::Null);
    mock.expect_get("/api/pages/1/").return_ok(json!([]));

    let dispatchers = pages(&mock);
    let pages = dispatchers.resource("pages").unwrap();
    pages
        .set_list(json!([{"id": 1, "slug": "a", "title": "T"}]), None)
        .await
        .unwrap();

    let first = pages
        .update(json!({"id": 1, "slug": "a", "title": "U"}), OperationOptions::new())
        .await
        .unwrap();
    assert_eq!(first.data(), Some(&Value::Null));

    let state = dispatchers.state().await.unwrap();
    assert!(!state.is_loading("pages", "update", None).unwrap());
    assert_eq!(state.list("pages", None).unwrap().unwrap()[&Key::from("a")]["title"], json!("U"));

    let second = pages
        .update(json!({"id": 1, "slug": "a", "title": "V"}), OperationOptions::new())
        .await
        .unwrap();
    assert!(second.is_success());

    let fetched = pages.get(json!({"id": 1}), OperationOptions::new()).await.unwrap();
    assert!(matches!(fetched, Outcome::Failed(TransportError::Decode(_))));

    let state = dispatchers.state().await.unwrap();
    assert!(!state.is_loading("pages", "get", None).unwrap());
    assert!(matches!(
        state.error("pages", "get", None).unwrap(),
        Some(TransportError::Decode(_))
    ));
    mock.verify();
}

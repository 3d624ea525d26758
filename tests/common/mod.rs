//! In-process mock of the Compass GraphQL endpoint.
//!
//! Requests are dispatched on substrings of the GraphQL document, the same
//! way the real API would route on the selected field. State lives behind a
//! mutex so tests can seed entities and inspect recorded requests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use compass_provider::config::ProviderConfig;
use compass_provider::testing::ProviderTester;
use compass_provider::{CompassClient, CompassProvider};
use serde_json::{json, Value};
use tiny_http::{Header, Response, Server};

pub const EMAIL: &str = "dev@example.com";
pub const TOKEN: &str = "test-token";
pub const TENANT: &str = "acme";
pub const TENANT_HOST: &str = "acme.atlassian.net";
pub const CLOUD_ID: &str = "cloud-1111";

/// One request as received by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub body: Value,
    pub headers: HashMap<String, String>,
}

impl RecordedRequest {
    pub fn query(&self) -> &str {
        self.body["query"].as_str().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

#[derive(Default)]
pub struct MockState {
    components: BTreeMap<String, Value>,
    links: BTreeMap<String, Vec<Value>>,
    cloud_ids: HashMap<String, String>,
    canned: VecDeque<(u16, String)>,
    requests: Vec<RecordedRequest>,
    next_id: u64,
    fail_next_mutation: Option<String>,
    duplicate_next_link: bool,
    hide_next_link: bool,
    denied: HashSet<String>,
}

/// The `QueryError` Compass returns in place of a component.
fn query_error(message: &str, status_code: u16, error_type: &str) -> Value {
    json!({
        "message": message,
        "extensions": [{"statusCode": status_code, "errorType": error_type}],
    })
}

impl MockState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn take_failure(&mut self) -> Option<Value> {
        self.fail_next_mutation
            .take()
            .map(|message| json!({"success": false, "errors": [{"message": message}]}))
    }

    fn graphql(&mut self, query: &str, vars: &Value) -> Value {
        if query.contains("tenantContexts(") {
            let host = vars["hostNames"][0].as_str().unwrap_or_default();
            let contexts: Vec<Value> = self
                .cloud_ids
                .get(host)
                .map(|id| json!({"cloudId": id}))
                .into_iter()
                .collect();
            return json!({"tenantContexts": contexts});
        }

        let input = &vars["input"];
        let compass = if query.contains("createComponentLink(") {
            json!({"createComponentLink": self.create_link(input)})
        } else if query.contains("updateComponentLink(") {
            json!({"updateComponentLink": self.update_link(input)})
        } else if query.contains("deleteComponentLink(") {
            json!({"deleteComponentLink": self.delete_link(input)})
        } else if query.contains("createComponent(") {
            let cloud_id = vars["cloudId"].as_str().unwrap_or_default().to_string();
            json!({"createComponent": self.create_component(&cloud_id, input)})
        } else if query.contains("updateComponent(") {
            json!({"updateComponent": self.update_component(input)})
        } else if query.contains("deleteComponent(") {
            json!({"deleteComponent": self.delete_component(input)})
        } else if query.contains("component(id:") && query.contains("links {") {
            let id = vars["componentId"].as_str().unwrap_or_default();
            json!({"component": self.list_links(id)})
        } else if query.contains("component(id:") {
            let id = vars["id"].as_str().unwrap_or_default();
            json!({"component": self.read_component(id)})
        } else {
            return Value::Null;
        };
        json!({"compass": compass})
    }

    fn create_component(&mut self, cloud_id: &str, input: &Value) -> Value {
        if let Some(failure) = self.take_failure() {
            return failure;
        }
        let id = format!("ari:cloud:compass:{}:component/{}", cloud_id, self.next_id());
        let type_id = input["type"].as_str().unwrap_or_default().to_lowercase();
        self.components.insert(
            id.clone(),
            json!({
                "id": id,
                "name": input["name"],
                "description": input.get("description").cloned().unwrap_or(Value::Null),
                "typeId": type_id,
                "ownerId": input.get("ownerId").cloned().unwrap_or(Value::Null),
                "customFields": input.get("customFields").cloned().unwrap_or(Value::Null),
            }),
        );
        json!({"success": true, "errors": [], "componentDetails": {"id": id}})
    }

    fn read_component(&self, id: &str) -> Value {
        if self.denied.contains(id) {
            return query_error("Forbidden", 403, "FORBIDDEN");
        }
        self.components
            .get(id)
            .cloned()
            .unwrap_or_else(|| query_error("Component not found", 404, "NOT_FOUND"))
    }

    fn update_component(&mut self, input: &Value) -> Value {
        if let Some(failure) = self.take_failure() {
            return failure;
        }
        let id = input["id"].as_str().unwrap_or_default();
        let Some(component) = self.components.get_mut(id) else {
            return json!({"success": false, "errors": [{"message": "Component not found"}]});
        };
        for field in ["name", "description", "ownerId"] {
            if let Some(value) = input.get(field) {
                component[field] = value.clone();
            }
        }
        json!({"success": true, "errors": []})
    }

    fn delete_component(&mut self, input: &Value) -> Value {
        if let Some(failure) = self.take_failure() {
            return failure;
        }
        let id = input["id"].as_str().unwrap_or_default();
        if self.components.remove(id).is_none() {
            return json!({"success": false, "errors": [{"message": "Component not found"}]});
        }
        self.links.remove(id);
        json!({"success": true, "errors": []})
    }

    fn create_link(&mut self, input: &Value) -> Value {
        if let Some(failure) = self.take_failure() {
            return failure;
        }
        let component_id = input["componentId"].as_str().unwrap_or_default().to_string();
        if !self.components.contains_key(&component_id) {
            return json!({"success": false, "errors": [{"message": "Component not found"}]});
        }
        if std::mem::take(&mut self.hide_next_link) {
            return json!({"success": true});
        }
        let copies = if std::mem::take(&mut self.duplicate_next_link) {
            2
        } else {
            1
        };
        for _ in 0..copies {
            let link = json!({
                "id": format!("lnk-{}", self.next_id()),
                "name": input["link"]["name"],
                "type": input["link"]["type"],
                "url": input["link"]["url"],
                "objectId": input["link"].get("objectId").cloned().unwrap_or(Value::Null),
            });
            self.links.entry(component_id.clone()).or_default().push(link);
        }
        json!({"success": true})
    }

    fn list_links(&self, component_id: &str) -> Value {
        if self.denied.contains(component_id) {
            return query_error("Forbidden", 403, "FORBIDDEN");
        }
        if !self.components.contains_key(component_id) {
            return query_error("Component not found", 404, "NOT_FOUND");
        }
        json!({
            "id": component_id,
            "links": self.links.get(component_id).cloned().unwrap_or_default(),
        })
    }

    fn update_link(&mut self, input: &Value) -> Value {
        if let Some(failure) = self.take_failure() {
            return failure;
        }
        let component_id = input["componentId"].as_str().unwrap_or_default();
        let link_id = input["link"]["id"].as_str().unwrap_or_default();
        let Some(link) = self
            .links
            .get_mut(component_id)
            .and_then(|links| links.iter_mut().find(|l| l["id"] == link_id))
        else {
            return json!({"success": false, "errors": [{"message": "Link not found"}]});
        };
        for field in ["name", "type", "url", "objectId"] {
            if let Some(value) = input["link"].get(field) {
                link[field] = value.clone();
            }
        }
        json!({"success": true})
    }

    fn delete_link(&mut self, input: &Value) -> Value {
        if let Some(failure) = self.take_failure() {
            return failure;
        }
        let component_id = input["componentId"].as_str().unwrap_or_default();
        let link_id = input["link"].as_str().unwrap_or_default();
        let Some(links) = self.links.get_mut(component_id) else {
            return json!({"success": false, "errors": [{"message": "Link not found"}]});
        };
        let before = links.len();
        links.retain(|l| l["id"] != link_id);
        if links.len() == before {
            return json!({"success": false, "errors": [{"message": "Link not found"}]});
        }
        json!({"success": true})
    }
}

/// A running mock server; stops when dropped.
pub struct MockCompass {
    server: Arc<Server>,
    state: Arc<Mutex<MockState>>,
    handle: Option<JoinHandle<()>>,
    url: String,
}

impl MockCompass {
    pub fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let state = Arc::new(Mutex::new(MockState::default()));

        let thread_server = Arc::clone(&server);
        let thread_state = Arc::clone(&state);
        let handle = thread::spawn(move || {
            for mut request in thread_server.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let headers = request
                    .headers()
                    .iter()
                    .map(|h| (h.field.to_string().to_ascii_lowercase(), h.value.to_string()))
                    .collect();
                let (status, payload) =
                    handle_request(&thread_state, request.url(), &body, headers);
                let response = Response::from_string(payload)
                    .with_status_code(status)
                    .with_header(Header::from_bytes("Content-Type", "application/json").unwrap());
                let _ = request.respond(response);
            }
        });

        Self {
            server,
            state,
            handle: Some(handle),
            url: format!("http://{addr}"),
        }
    }

    /// Start with the default tenant registered.
    pub fn with_tenant() -> Self {
        let mock = Self::start();
        mock.register_tenant(TENANT_HOST, CLOUD_ID);
        mock
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn register_tenant(&self, host: &str, cloud_id: &str) {
        self.state()
            .cloud_ids
            .insert(host.to_string(), cloud_id.to_string());
    }

    /// Answer the next request with a raw status and body.
    pub fn queue_response(&self, status: u16, body: impl Into<String>) {
        self.state().canned.push_back((status, body.into()));
    }

    /// Answer reads of `id` with a permission `QueryError` while it stays stored.
    pub fn deny_component(&self, id: &str) {
        self.state().denied.insert(id.to_string());
    }

    /// Make the next mutation report `success: false` with `message`.
    pub fn fail_next_mutation(&self, message: &str) {
        self.state().fail_next_mutation = Some(message.to_string());
    }

    /// Make the next link create insert two identical links.
    pub fn duplicate_next_link(&self) {
        self.state().duplicate_next_link = true;
    }

    /// Make the next link create succeed without the link being listed.
    pub fn hide_next_link(&self) {
        self.state().hide_next_link = true;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state().requests.len()
    }

    /// Queries received so far containing `needle`.
    pub fn count_queries(&self, needle: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|r| r.query().contains(needle))
            .count()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.state().requests.last().cloned().unwrap()
    }

    pub fn component(&self, id: &str) -> Option<Value> {
        self.state().components.get(id).cloned()
    }

    pub fn links(&self, component_id: &str) -> Vec<Value> {
        self.state()
            .links
            .get(component_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Seed a component directly, bypassing the API.
    pub fn insert_component(&self, id: &str, name: &str, type_id: &str) {
        self.state().components.insert(
            id.to_string(),
            json!({
                "id": id,
                "name": name,
                "description": null,
                "typeId": type_id,
                "ownerId": null,
            }),
        );
    }

    /// Seed a link directly, bypassing the API.
    pub fn insert_link(&self, component_id: &str, link: Value) {
        self.state()
            .links
            .entry(component_id.to_string())
            .or_default()
            .push(link);
    }

    /// Remove a component behind the provider's back.
    pub fn remove_component(&self, id: &str) {
        let mut state = self.state();
        state.components.remove(id);
        state.links.remove(id);
    }

    pub fn config(&self) -> ProviderConfig {
        ProviderConfig::new(EMAIL, TOKEN).with_base_url(self.url())
    }

    pub fn client(&self) -> CompassClient {
        CompassClient::new(&self.config()).unwrap()
    }

    pub fn tenant_client(&self) -> CompassClient {
        CompassClient::new(&self.config().with_tenant(TENANT)).unwrap()
    }

    /// Provider block pointing at this server.
    pub fn provider_block(&self, tenant: Option<&str>) -> Value {
        let mut block = json!({
            "email": EMAIL,
            "api_token": TOKEN,
            "base_url": self.url(),
        });
        if let Some(tenant) = tenant {
            block["tenant"] = json!(tenant);
        }
        block
    }

    /// A configured tester with no environment fallbacks.
    pub async fn tester(&self, tenant: Option<&str>) -> ProviderTester<CompassProvider> {
        let tester = ProviderTester::new(CompassProvider::with_env(|_| None));
        tester.configure(self.provider_block(tenant)).await.unwrap();
        tester
    }
}

impl Drop for MockCompass {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn handle_request(
    state: &Mutex<MockState>,
    url: &str,
    body: &str,
    headers: HashMap<String, String>,
) -> (u16, String) {
    let mut state = state.lock().unwrap();
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    state.requests.push(RecordedRequest {
        url: url.to_string(),
        body: parsed.clone(),
        headers,
    });

    if let Some(canned) = state.canned.pop_front() {
        return canned;
    }
    if url != "/graphql" {
        return (404, "not found".to_string());
    }

    let query = parsed["query"].as_str().unwrap_or_default().to_string();
    let vars = parsed.get("variables").cloned().unwrap_or_else(|| json!({}));
    let data = state.graphql(&query, &vars);
    (200, json!({"data": data}).to_string())
}

/// A URL nothing listens on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn init_tracing() {
    compass_provider::try_init_logging();
}

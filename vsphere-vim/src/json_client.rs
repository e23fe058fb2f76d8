//! Client HTTPS de l'API VI/JSON (`https://{host}:{port}/sdk/vim25/{release}/...`)
//!
//! Chaque méthode d'objet géré devient `POST {base}/{type}/{moId}/{method}` et
//! chaque propriété `GET {base}/{type}/{moId}/{property}`. L'id de session
//! rendu par `SessionManager/Login` voyage ensuite dans l'en-tête
//! `vmware-api-session-id` de chaque requête.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

use crate::api::{VimApi, VimConnector};
use crate::error::VimError;
use crate::types::{
    ConnectTarget, ManagedObjectReference, MissingProperty, ObjectContent, PerfCounterInfo,
    PerfEntityMetric, PerfQuerySpec, ServiceContent,
};

pub const SESSION_HEADER: &str = "vmware-api-session-id";
pub const DEFAULT_RELEASE: &str = "8.0.1.0";

/// Ouvre les sessions VI/JSON
#[derive(Debug, Clone)]
pub struct VimJsonConnector {
    release: String,
    accept_invalid_certs: bool,
}

impl Default for VimJsonConnector {
    fn default() -> Self {
        Self::new(DEFAULT_RELEASE)
    }
}

impl VimJsonConnector {
    /// Les appliances de gestion livrent des certificats auto-signés : la
    /// vérification reste coupée sauf appel à `accept_invalid_certs(false)`.
    pub fn new(release: impl Into<String>) -> Self {
        Self { release: release.into(), accept_invalid_certs: true }
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn base_url(&self, target: &ConnectTarget) -> String {
        format!("https://{}:{}/sdk/vim25/{}", target.url_host(), target.port, self.release)
    }
}

#[async_trait]
impl VimConnector for VimJsonConnector {
    async fn connect(&self, target: &ConnectTarget) -> Result<Arc<dyn VimApi>, VimError> {
        let http = Client::builder()
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()?;
        let base = self.base_url(target);

        let resp = http
            .get(format!("{base}/ServiceInstance/ServiceInstance/content"))
            .send()
            .await?;
        let content: ServiceContent = check(resp).await?.json().await?;

        let resp = http
            .post(format!("{base}/SessionManager/{}/Login", content.session_manager.value))
            .json(&json!({ "userName": target.user, "password": target.password }))
            .send()
            .await?;
        let resp = check(resp).await?;
        let session_id = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(VimError::MissingSession)?;

        if let Some(about) = &content.about {
            info!("session opened on {} ({}, API {})", target.host, about.full_name, about.api_version);
        }

        let session: Arc<dyn VimApi> = Arc::new(VimJsonClient { http, base, session_id, content });
        Ok(session)
    }
}

/// Une session VI/JSON authentifiée
pub struct VimJsonClient {
    http: Client,
    base: String,
    session_id: String,
    content: ServiceContent,
}

impl VimJsonClient {
    fn url(&self, obj: &ManagedObjectReference, member: &str) -> String {
        format!("{}/{}/{}/{}", self.base, obj.kind, obj.value, member)
    }

    async fn get<T: DeserializeOwned>(&self, obj: &ManagedObjectReference, property: &str) -> Result<T, VimError> {
        let resp = self
            .http
            .get(self.url(obj, property))
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await?;
        decode(check(resp).await?).await
    }

    async fn post(&self, obj: &ManagedObjectReference, method: &str, body: Option<&Value>) -> Result<Response, VimError> {
        let mut req = self
            .http
            .post(self.url(obj, method))
            .header(SESSION_HEADER, &self.session_id);
        if let Some(body) = body {
            req = req.json(body);
        }
        check(req.send().await?).await
    }
}

#[async_trait]
impl VimApi for VimJsonClient {
    fn content(&self) -> &ServiceContent {
        &self.content
    }

    async fn create_container_view(
        &self,
        container: &ManagedObjectReference,
        kinds: &[&str],
        recursive: bool,
    ) -> Result<ManagedObjectReference, VimError> {
        let body = json!({
            "container": moref_json(container),
            "type": kinds,
            "recursive": recursive,
        });
        let resp = self.post(&self.content.view_manager, "CreateContainerView", Some(&body)).await?;
        decode(resp).await
    }

    async fn view_objects(&self, view: &ManagedObjectReference) -> Result<Vec<ManagedObjectReference>, VimError> {
        let objects: Option<Vec<ManagedObjectReference>> = self.get(view, "view").await?;
        Ok(objects.unwrap_or_default())
    }

    async fn destroy_view(&self, view: &ManagedObjectReference) -> Result<(), VimError> {
        self.post(view, "DestroyView", None).await?;
        debug!("destroyed view {}", view);
        Ok(())
    }

    async fn retrieve_properties(
        &self,
        objects: &[ManagedObjectReference],
        paths: &[&str],
    ) -> Result<Vec<ObjectContent>, VimError> {
        if objects.is_empty() {
            return Ok(Vec::new());
        }
        let collector = &self.content.property_collector;
        let resp = self
            .post(collector, "RetrievePropertiesEx", Some(&retrieve_body(objects, paths)))
            .await?;
        let mut page: Option<RetrieveResult> = decode(resp).await?;

        let mut out = Vec::with_capacity(objects.len());
        while let Some(result) = page.take() {
            out.extend(result.objects.into_iter().map(ObjectContent::from));
            if let Some(token) = result.token {
                let resp = self
                    .post(collector, "ContinueRetrievePropertiesEx", Some(&json!({ "token": token })))
                    .await?;
                page = decode(resp).await?;
            }
        }
        Ok(out)
    }

    async fn perf_counters(&self) -> Result<Vec<PerfCounterInfo>, VimError> {
        let counters: Option<Vec<PerfCounterInfo>> = self.get(&self.content.perf_manager, "perfCounter").await?;
        Ok(counters.unwrap_or_default())
    }

    async fn query_perf(&self, spec: &PerfQuerySpec) -> Result<Vec<PerfEntityMetric>, VimError> {
        let body = json!({ "querySpec": [query_spec_json(spec)?] });
        let resp = self.post(&self.content.perf_manager, "QueryPerf", Some(&body)).await?;
        let metrics: Option<Vec<PerfEntityMetric>> = decode(resp).await?;
        Ok(metrics.unwrap_or_default())
    }

    async fn invoke(
        &self,
        obj: &ManagedObjectReference,
        method: &str,
        args: Value,
    ) -> Result<Option<ManagedObjectReference>, VimError> {
        let body = (!args.is_null()).then_some(&args);
        let resp = self.post(obj, method, body).await?;
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_slice(&bytes)?;
        Ok(serde_json::from_value(value).ok())
    }

    async fn logout(&self) -> Result<(), VimError> {
        self.post(&self.content.session_manager, "Logout", None).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RetrieveResult {
    #[serde(default)]
    objects: Vec<ObjectContentWire>,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectContentWire {
    obj: ManagedObjectReference,
    #[serde(default)]
    prop_set: Vec<DynamicProperty>,
    #[serde(default)]
    missing_set: Vec<MissingPropertyWire>,
}

#[derive(Debug, Deserialize)]
struct DynamicProperty {
    name: String,
    #[serde(default)]
    val: Value,
}

#[derive(Debug, Deserialize)]
struct MissingPropertyWire {
    path: String,
    #[serde(default)]
    fault: Value,
}

impl From<ObjectContentWire> for ObjectContent {
    fn from(wire: ObjectContentWire) -> Self {
        let properties: HashMap<String, Value> = wire
            .prop_set
            .into_iter()
            .map(|p| (p.name, unbox(p.val)))
            .collect();
        let missing = wire
            .missing_set
            .into_iter()
            .map(|m| MissingProperty { path: m.path, fault: fault_name(&m.fault) })
            .collect();
        ObjectContent { obj: wire.obj, properties, missing }
    }
}

/// Les valeurs `xsd:anyType` arrivent emballées en `{"_typeName": ..., "_value": ...}`
fn unbox(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("_value") => map.remove("_value").unwrap_or(Value::Null),
        other => other,
    }
}

/// LocalizedMethodFault → nom du fault (ex: "NoPermission")
fn fault_name(fault: &Value) -> String {
    fault
        .pointer("/fault/_typeName")
        .or_else(|| fault.get("_typeName"))
        .and_then(Value::as_str)
        .or_else(|| fault.get("localizedMessage").and_then(Value::as_str))
        .unwrap_or("UnknownFault")
        .to_string()
}

fn moref_json(moref: &ManagedObjectReference) -> Value {
    json!({ "_typeName": "ManagedObjectReference", "type": moref.kind, "value": moref.value })
}

fn retrieve_body(objects: &[ManagedObjectReference], paths: &[&str]) -> Value {
    // un PropertySpec par type, dans l'ordre de première apparition
    let mut kinds: Vec<&str> = Vec::new();
    for obj in objects {
        if !kinds.contains(&obj.kind.as_str()) {
            kinds.push(&obj.kind);
        }
    }
    let prop_set: Vec<Value> = kinds
        .iter()
        .map(|kind| json!({ "_typeName": "PropertySpec", "type": kind, "pathSet": paths }))
        .collect();
    let object_set: Vec<Value> = objects
        .iter()
        .map(|obj| json!({ "_typeName": "ObjectSpec", "obj": moref_json(obj) }))
        .collect();
    json!({
        "specSet": [{
            "_typeName": "PropertyFilterSpec",
            "propSet": prop_set,
            "objectSet": object_set,
        }],
        "options": { "_typeName": "RetrieveOptions" },
    })
}

fn query_spec_json(spec: &PerfQuerySpec) -> Result<Value, VimError> {
    let metric_ids: Vec<Value> = spec
        .metric_ids
        .iter()
        .map(|id| json!({ "_typeName": "PerfMetricId", "counterId": id.counter_id, "instance": id.instance }))
        .collect();
    Ok(json!({
        "_typeName": "PerfQuerySpec",
        "entity": moref_json(&spec.entity),
        "startTime": spec.start_time.format(&Rfc3339)?,
        "endTime": spec.end_time.format(&Rfc3339)?,
        "maxSample": spec.max_sample,
        "metricId": metric_ids,
        "intervalId": spec.interval_id,
    }))
}

/// Convertit les réponses hors 2xx en `VimError`, avec le fault décodé s'il existe
async fn check(resp: Response) -> Result<Response, VimError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(parse_fault(status.as_u16(), &body))
}

fn parse_fault(status: u16, body: &str) -> VimError {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return VimError::Status { status, body: body.to_string() };
    };
    let Some(kind) = value.get("_typeName").and_then(Value::as_str) else {
        return VimError::Status { status, body: body.to_string() };
    };
    let message = value
        .get("message")
        .or_else(|| value.get("localizedMessage"))
        .or_else(|| value.pointer("/faultMessage/0/message"))
        .and_then(Value::as_str)
        .unwrap_or(kind);
    VimError::fault(kind, message)
}

/// Un corps vide se décode en `null`
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, VimError> {
    let bytes = resp.bytes().await?;
    if bytes.is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

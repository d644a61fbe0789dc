//! Request handlers. Every call into the ledger engine runs on the blocking
//! pool because the engine waits on row locks and journal writes.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use rek_catalog::{
    Category, Component, ComponentPatch, ComponentQuery, Location, Manufacturer, NewCategory,
    NewComponent, NewLocation, NewManufacturer, NewSupplier, Supplier, SupplierPatch,
};
use rek_ledger::{
    verify, Adjustment, AuditEntry, Confirmation, Document, DocumentFilter, DocumentStatus,
    InventoryCount, InventoryOutcome, LedgerError, LedgerReader, NewDocument, NewInventory,
    NewLine, StockRow, ValidationReport,
};
use rek_report::{AuditFilter, ComponentTotal, Movement, MovementFilter, ReportBuilder, StockLine};
use rek_types::{
    ActionType, CategoryId, ComponentId, DocumentId, DocumentKind, LocationId, ManufacturerId,
    SupplierId,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Header naming the operator behind a request.
pub const ACTOR_HEADER: &str = "x-rek-user";

fn actor(headers: &HeaderMap, explicit: Option<String>) -> String {
    explicit
        .filter(|name| !name.trim().is_empty())
        .or_else(|| {
            headers
                .get(ACTOR_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "anonymous".to_string())
}

async fn blocking<T, F>(work: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}

fn yes() -> bool {
    true
}

// ── service ─────────────────────────────────────────────────────────────

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn info_handler(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    blocking(move || {
        Ok(Json(json!({
            "name": "rek-server",
            "version": env!("CARGO_PKG_VERSION"),
            "documents": state.engine.document_store().len(),
            "stock_rows": state.engine.stock().len(),
            "audit_entries": state.engine.audit().len(),
        })))
    })
    .await
}

pub async fn verify_handler(State(state): State<AppState>) -> ServerResult<Json<ValidationReport>> {
    blocking(move || Ok(Json(verify(state.engine.as_ref())))).await
}

// ── reference data ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActiveQuery {
    #[serde(default = "yes")]
    pub active_only: bool,
}

pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.catalog.categories())
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(new): Json<NewCategory>,
) -> ServerResult<(StatusCode, Json<Category>)> {
    let category = blocking(move || Ok(state.catalog.create_category(new)?)).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> ServerResult<StatusCode> {
    blocking(move || Ok(state.catalog.delete_category(id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_manufacturers(State(state): State<AppState>) -> Json<Vec<Manufacturer>> {
    Json(state.catalog.manufacturers())
}

pub async fn create_manufacturer(
    State(state): State<AppState>,
    Json(new): Json<NewManufacturer>,
) -> ServerResult<(StatusCode, Json<Manufacturer>)> {
    let manufacturer = blocking(move || Ok(state.catalog.create_manufacturer(new)?)).await?;
    Ok((StatusCode::CREATED, Json(manufacturer)))
}

pub async fn get_manufacturer(
    State(state): State<AppState>,
    Path(id): Path<ManufacturerId>,
) -> ServerResult<Json<Manufacturer>> {
    Ok(Json(state.catalog.manufacturer(id)?))
}

pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> Json<Vec<Supplier>> {
    Json(state.catalog.suppliers(query.active_only))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Json(new): Json<NewSupplier>,
) -> ServerResult<(StatusCode, Json<Supplier>)> {
    let supplier = blocking(move || Ok(state.catalog.create_supplier(new)?)).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<SupplierId>,
) -> ServerResult<Json<Supplier>> {
    Ok(Json(state.catalog.supplier(id)?))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<SupplierId>,
    Json(patch): Json<SupplierPatch>,
) -> ServerResult<Json<Supplier>> {
    let supplier = blocking(move || Ok(state.catalog.update_supplier(id, patch)?)).await?;
    Ok(Json(supplier))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<SupplierId>,
) -> ServerResult<StatusCode> {
    blocking(move || Ok(state.catalog.deactivate_supplier(id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> Json<Vec<Location>> {
    Json(state.catalog.locations(query.active_only))
}

pub async fn create_location(
    State(state): State<AppState>,
    Json(new): Json<NewLocation>,
) -> ServerResult<(StatusCode, Json<Location>)> {
    let location = blocking(move || Ok(state.catalog.create_location(new)?)).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

#[derive(Debug, Deserialize)]
pub struct ComponentListQuery {
    pub category: Option<CategoryId>,
    pub manufacturer: Option<ManufacturerId>,
    pub search: Option<String>,
    #[serde(default = "yes")]
    pub active_only: bool,
}

pub async fn list_components(
    State(state): State<AppState>,
    Query(query): Query<ComponentListQuery>,
) -> Json<Vec<Component>> {
    Json(state.catalog.components(&ComponentQuery {
        category: query.category,
        manufacturer: query.manufacturer,
        search: query.search,
        include_inactive: !query.active_only,
    }))
}

pub async fn get_component(
    State(state): State<AppState>,
    Path(id): Path<ComponentId>,
) -> ServerResult<Json<Component>> {
    Ok(Json(state.catalog.component(id)?))
}

pub async fn create_component(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewComponent>,
) -> ServerResult<(StatusCode, Json<Component>)> {
    let by = actor(&headers, None);
    let component = blocking(move || {
        state.catalog.create_component_recorded(new, |component| {
            state.engine.record_catalog_event(
                ActionType::Create,
                component.id,
                &by,
                Some(format!("created component {}", component.part_number)),
            )?;
            Ok::<(), ServerError>(())
        })
    })
    .await?;
    Ok((StatusCode::CREATED, Json(component)))
}

pub async fn update_component(
    State(state): State<AppState>,
    Path(id): Path<ComponentId>,
    headers: HeaderMap,
    Json(patch): Json<ComponentPatch>,
) -> ServerResult<Json<Component>> {
    let by = actor(&headers, None);
    let component = blocking(move || {
        let fields = patch.changed_fields().join(", ");
        state.catalog.update_component_recorded(id, patch, |component| {
            state.engine.record_catalog_event(
                ActionType::Update,
                component.id,
                &by,
                Some(format!("updated component {}: {fields}", component.part_number)),
            )?;
            Ok::<(), ServerError>(())
        })
    })
    .await?;
    Ok(Json(component))
}

pub async fn delete_component(
    State(state): State<AppState>,
    Path(id): Path<ComponentId>,
    headers: HeaderMap,
) -> ServerResult<StatusCode> {
    let by = actor(&headers, None);
    blocking(move || {
        state.catalog.deactivate_component_recorded(id, |component| {
            state.engine.record_catalog_event(
                ActionType::Delete,
                component.id,
                &by,
                Some(format!("deactivated component {}", component.part_number)),
            )?;
            Ok::<(), ServerError>(())
        })?;
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── stock ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StockQuery {
    pub component: Option<ComponentId>,
    pub location: Option<LocationId>,
    pub below_min_only: bool,
}

pub async fn list_stocks(
    State(state): State<AppState>,
    Query(query): Query<StockQuery>,
) -> ServerResult<Json<Vec<StockLine>>> {
    blocking(move || {
        let lines = ReportBuilder::stock_summary(state.engine.as_ref(), query.below_min_only)
            .filter(|l| query.component.map_or(true, |c| l.component == c))
            .filter(|l| query.location.map_or(true, |loc| l.location == loc))
            .collect();
        Ok(Json(lines))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub component: ComponentId,
    pub location: LocationId,
    /// New absolute quantity.
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub performed_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdjustResponse {
    pub row: StockRow,
    pub entry: AuditEntry,
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AdjustRequest>,
) -> ServerResult<Json<AdjustResponse>> {
    let adjustment = Adjustment {
        component: request.component,
        location: request.location,
        new_quantity: request.quantity,
        reason: request.reason,
        performed_by: actor(&headers, request.performed_by),
    };
    blocking(move || {
        let (row, entry) = state.engine.adjust(adjustment)?;
        Ok(Json(AdjustResponse { row, entry }))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct ThresholdRequest {
    pub component: ComponentId,
    pub location: LocationId,
    pub threshold: u64,
}

pub async fn set_threshold(
    State(state): State<AppState>,
    Json(request): Json<ThresholdRequest>,
) -> ServerResult<Json<StockRow>> {
    blocking(move || {
        let row = state
            .engine
            .set_threshold(request.component, request.location, request.threshold)?;
        Ok(Json(row))
    })
    .await
}

// ── documents ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusQuery {
    pub status: Option<DocumentStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TransitionRequest {
    pub performed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptRequest {
    pub number: String,
    pub supplier: SupplierId,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    pub lines: Vec<NewLine>,
}

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub number: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub requester: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    pub lines: Vec<NewLine>,
}

#[derive(Debug, Deserialize)]
pub struct InventoryRequest {
    pub number: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    pub lines: Vec<InventoryCount>,
}

async fn list_kind(
    state: AppState,
    kind: DocumentKind,
    status: Option<DocumentStatus>,
) -> ServerResult<Json<Vec<Document>>> {
    blocking(move || {
        let filter = DocumentFilter {
            kind: Some(kind),
            status,
        };
        Ok(Json(state.engine.documents(filter)))
    })
    .await
}

/// Fetch a document, treating one of another kind as absent.
fn document_of_kind(state: &AppState, kind: DocumentKind, id: DocumentId) -> ServerResult<Document> {
    state
        .engine
        .document(id)
        .filter(|d| d.kind == kind)
        .ok_or(ServerError::Ledger(LedgerError::NotFound(id)))
}

async fn get_kind(state: AppState, kind: DocumentKind, id: DocumentId) -> ServerResult<Json<Document>> {
    blocking(move || document_of_kind(&state, kind, id).map(Json)).await
}

async fn create_kind(state: AppState, new: NewDocument) -> ServerResult<(StatusCode, Json<Document>)> {
    let document = blocking(move || Ok(state.engine.create_draft(new)?)).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

async fn confirm_kind(
    state: AppState,
    kind: DocumentKind,
    id: DocumentId,
    by: String,
) -> ServerResult<Json<Confirmation>> {
    blocking(move || {
        document_of_kind(&state, kind, id)?;
        Ok(Json(state.engine.confirm(id, &by)?))
    })
    .await
}

async fn cancel_kind(
    state: AppState,
    kind: DocumentKind,
    id: DocumentId,
    by: String,
) -> ServerResult<Json<Document>> {
    blocking(move || {
        document_of_kind(&state, kind, id)?;
        Ok(Json(state.engine.cancel(id, &by)?))
    })
    .await
}

pub async fn list_receipts(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> ServerResult<Json<Vec<Document>>> {
    list_kind(state, DocumentKind::Receipt, query.status).await
}

pub async fn create_receipt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReceiptRequest>,
) -> ServerResult<(StatusCode, Json<Document>)> {
    let by = actor(&headers, request.created_by);
    let mut new = NewDocument::receipt(&request.number, request.supplier, &by);
    new.invoice_number = request.invoice_number;
    new.notes = request.notes;
    new.lines = request.lines;
    create_kind(state, new).await
}

pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> ServerResult<Json<Document>> {
    get_kind(state, DocumentKind::Receipt, id).await
}

pub async fn confirm_receipt(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    headers: HeaderMap,
    body: Option<Json<TransitionRequest>>,
) -> ServerResult<Json<Confirmation>> {
    let by = actor(&headers, body.and_then(|Json(b)| b.performed_by));
    confirm_kind(state, DocumentKind::Receipt, id, by).await
}

pub async fn cancel_receipt(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    headers: HeaderMap,
    body: Option<Json<TransitionRequest>>,
) -> ServerResult<Json<Document>> {
    let by = actor(&headers, body.and_then(|Json(b)| b.performed_by));
    cancel_kind(state, DocumentKind::Receipt, id, by).await
}

pub async fn list_issues(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> ServerResult<Json<Vec<Document>>> {
    list_kind(state, DocumentKind::Issue, query.status).await
}

pub async fn create_issue(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<IssueRequest>,
) -> ServerResult<(StatusCode, Json<Document>)> {
    let by = actor(&headers, request.created_by);
    let mut new = NewDocument::issue(&request.number, &by);
    new.department = request.department;
    new.requester = request.requester;
    new.purpose = request.purpose;
    new.notes = request.notes;
    new.lines = request.lines;
    create_kind(state, new).await
}

pub async fn get_issue(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> ServerResult<Json<Document>> {
    get_kind(state, DocumentKind::Issue, id).await
}

pub async fn confirm_issue(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    headers: HeaderMap,
    body: Option<Json<TransitionRequest>>,
) -> ServerResult<Json<Confirmation>> {
    let by = actor(&headers, body.and_then(|Json(b)| b.performed_by));
    confirm_kind(state, DocumentKind::Issue, id, by).await
}

pub async fn cancel_issue(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    headers: HeaderMap,
    body: Option<Json<TransitionRequest>>,
) -> ServerResult<Json<Document>> {
    let by = actor(&headers, body.and_then(|Json(b)| b.performed_by));
    cancel_kind(state, DocumentKind::Issue, id, by).await
}

pub async fn list_inventories(State(state): State<AppState>) -> ServerResult<Json<Vec<Document>>> {
    list_kind(state, DocumentKind::Inventory, None).await
}

pub async fn create_inventory(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<InventoryRequest>,
) -> ServerResult<(StatusCode, Json<InventoryOutcome>)> {
    let by = actor(&headers, request.created_by);
    let mut inventory = NewInventory::new(&request.number, &by);
    inventory.notes = request.notes;
    inventory.lines = request.lines;
    let outcome = blocking(move || Ok(state.engine.apply_inventory(inventory)?)).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn get_inventory(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> ServerResult<Json<Document>> {
    get_kind(state, DocumentKind::Inventory, id).await
}

// ── audit and reports ───────────────────────────────────────────────────

pub async fn audit_handler(
    State(state): State<AppState>,
    Query(filter): Query<AuditFilter>,
) -> ServerResult<Json<Vec<AuditEntry>>> {
    blocking(move || Ok(Json(ReportBuilder::audit_log(state.engine.as_ref(), &filter)?))).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BelowMinQuery {
    pub below_min_only: bool,
}

pub async fn stock_report(
    State(state): State<AppState>,
    Query(query): Query<BelowMinQuery>,
) -> ServerResult<Json<Vec<ComponentTotal>>> {
    blocking(move || {
        Ok(Json(ReportBuilder::component_totals(
            state.engine.as_ref(),
            &state.catalog,
            query.below_min_only,
        )))
    })
    .await
}

pub async fn summary_report(
    State(state): State<AppState>,
    Query(query): Query<BelowMinQuery>,
) -> ServerResult<Json<Vec<StockLine>>> {
    blocking(move || {
        Ok(Json(
            ReportBuilder::stock_summary(state.engine.as_ref(), query.below_min_only).collect(),
        ))
    })
    .await
}

pub async fn movements_report(
    State(state): State<AppState>,
    Query(filter): Query<MovementFilter>,
) -> ServerResult<Json<Vec<Movement>>> {
    blocking(move || {
        Ok(Json(ReportBuilder::movement_report(
            state.engine.as_ref(),
            &filter,
        )?))
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HistoryQuery {
    pub location: Option<LocationId>,
}

pub async fn history_report(
    State(state): State<AppState>,
    Path(component): Path<ComponentId>,
    Query(query): Query<HistoryQuery>,
) -> ServerResult<Json<Vec<AuditEntry>>> {
    blocking(move || {
        Ok(Json(ReportBuilder::movement_history(
            state.engine.as_ref(),
            component,
            query.location,
        )))
    })
    .await
}

//! Client for a single Hydra node: lifecycle status, command/response
//! correlation, and the node's HTTP side.
//!
//! A single demultiplexing task reads the transport's broadcast, decodes
//! each frame once, updates the status watch and the confirmed-tx ring, and
//! completes whichever pending call the frame terminates. Calls never steal
//! each other's messages: each is keyed by `(command, correlation id)` and
//! only a matching terminal event resolves it.

use crate::error::{NodeError, TransportError};
use crate::message::{ClientCommand, ServerMessage};
use crate::transport::{ConnectionState, Transport, TransportEvent};
use chain_core::types::{CostModels, LOVELACE};
use chain_core::{hash, Assets, ProtocolParameters, TxEnvelope, Utxo};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, watch};

/// How many recently confirmed transaction ids are retained.
///
/// Confirmations older than the last 1000 may be reported as unconfirmed;
/// this is the documented bound on memory, not a cache to grow.
const CONFIRMED_TX_CAPACITY: usize = 1000;

/// Interval at which Close/Fanout commands are re-sent until a terminal
/// event arrives (tolerates command loss and leader-election delay).
const RESEND_INTERVAL: Duration = Duration::from_secs(10);

/// Head lifecycle as this participant's node reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadStatus {
    Idle,
    Disconnected,
    Connecting,
    Connected,
    Initializing,
    Open,
    Closed,
    FanoutPossible,
    Final,
}

impl HeadStatus {
    /// Parse a `Greetings.headStatus` string, case-insensitively
    fn from_greeting(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "IDLE" => Some(HeadStatus::Idle),
            "DISCONNECTED" => Some(HeadStatus::Disconnected),
            "CONNECTING" => Some(HeadStatus::Connecting),
            "CONNECTED" => Some(HeadStatus::Connected),
            "INITIALIZING" => Some(HeadStatus::Initializing),
            "OPEN" => Some(HeadStatus::Open),
            "CLOSED" => Some(HeadStatus::Closed),
            "FANOUT_POSSIBLE" | "FANOUTPOSSIBLE" => Some(HeadStatus::FanoutPossible),
            "FINAL" => Some(HeadStatus::Final),
            _ => None,
        }
    }

    /// Status derivation table. Tags not listed leave the status unchanged.
    fn from_message(message: &ServerMessage) -> Option<Self> {
        match message {
            ServerMessage::Greetings { head_status } => {
                let parsed = Self::from_greeting(head_status);
                if parsed.is_none() {
                    tracing::debug!(head_status, "unrecognized greeting status");
                }
                parsed
            }
            ServerMessage::HeadIsInitializing => Some(HeadStatus::Initializing),
            ServerMessage::HeadIsOpen => Some(HeadStatus::Open),
            ServerMessage::HeadIsClosed => Some(HeadStatus::Closed),
            ServerMessage::ReadyToFanout => Some(HeadStatus::FanoutPossible),
            ServerMessage::HeadIsFinalized => Some(HeadStatus::Final),
            _ => None,
        }
    }
}

/// Correlation key of an in-flight command
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CallKey {
    Init,
    Close,
    Fanout,
    NewTx(String),
}

impl CallKey {
    fn command_name(&self) -> &'static str {
        match self {
            CallKey::Init => "Init",
            CallKey::Close => "Close",
            CallKey::Fanout => "Fanout",
            CallKey::NewTx(_) => "NewTx",
        }
    }
}

/// Fixed-capacity ring of recently confirmed transaction ids
struct ConfirmedTxRing {
    slots: Vec<Option<String>>,
    cursor: usize,
}

impl ConfirmedTxRing {
    fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            cursor: 0,
        }
    }

    fn push(&mut self, tx_id: String) {
        self.cursor = (self.cursor + 1) % self.slots.len();
        self.slots[self.cursor] = Some(tx_id);
    }

    fn contains(&self, tx_id: &str) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.as_deref() == Some(tx_id))
    }
}

struct NodeInner {
    name: String,
    http_url: String,
    transport: Transport,
    http: reqwest::Client,
    status: watch::Sender<HeadStatus>,
    calls: Mutex<HashMap<CallKey, oneshot::Sender<Result<(), NodeError>>>>,
    confirmed: Mutex<ConfirmedTxRing>,
    resend_interval: Duration,
    demux_started: Mutex<bool>,
}

/// Protocol client for one head participant
#[derive(Clone)]
pub struct NodeClient {
    inner: Arc<NodeInner>,
}

impl NodeClient {
    /// `url` is the node's base URL in either scheme; the WebSocket and HTTP
    /// sides are derived from it.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let http_url = url.replace("ws", "http");
        let (status, _) = watch::channel(HeadStatus::Disconnected);
        Self {
            inner: Arc::new(NodeInner {
                name: name.into(),
                http_url,
                transport: Transport::new(url),
                http: reqwest::Client::new(),
                status,
                calls: Mutex::new(HashMap::new()),
                confirmed: Mutex::new(ConfirmedTxRing::new(CONFIRMED_TX_CAPACITY)),
                resend_interval: RESEND_INTERVAL,
                demux_started: Mutex::new(false),
            }),
        }
    }

    /// Shorten the Close/Fanout resend interval (tests)
    pub fn with_resend_interval(mut self, interval: Duration) -> Self {
        Arc::get_mut(&mut self.inner)
            .expect("with_resend_interval must be called before sharing the client")
            .resend_interval = interval;
        self
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn status(&self) -> HeadStatus {
        *self.inner.status.borrow()
    }

    pub fn status_watch(&self) -> watch::Receiver<HeadStatus> {
        self.inner.status.subscribe()
    }

    /// Connect the transport and start the demultiplexing loop
    pub fn connect(&self) {
        {
            let mut started = self.inner.demux_started.lock();
            if !*started {
                *started = true;
                tokio::spawn(demux(self.inner.clone(), self.inner.transport.subscribe()));
                tokio::spawn(track_connection(
                    self.inner.clone(),
                    self.inner.transport.state_watch(),
                ));
            }
        }
        self.inner.transport.connect();
    }

    pub fn disconnect(&self) {
        self.inner.transport.disconnect();
        self.inner.status.send_replace(HeadStatus::Disconnected);
    }

    /// Ask the coordinator's node to initialize the head.
    ///
    /// Fails fast without sending anything unless the head is Idle.
    pub async fn init(&self) -> Result<(), NodeError> {
        let status = self.status();
        if status != HeadStatus::Idle {
            return Err(NodeError::InvalidStatus {
                operation: "init",
                status,
            });
        }
        let rx = self.inner.register(CallKey::Init)?;
        if let Err(e) = self
            .inner
            .transport
            .send(ClientCommand::Init.to_json())
            .await
        {
            self.inner.abandon(&CallKey::Init);
            return Err(e.into());
        }
        await_completion(rx).await
    }

    /// Submit a transaction to the head's off-chain ledger.
    ///
    /// The id is computed locally before sending so the matching
    /// `TxValid`/`TxInvalid` can be identified among concurrent calls.
    pub async fn new_tx(&self, transaction: &TxEnvelope) -> Result<String, NodeError> {
        let tx_id = hash::tx_id(&transaction.cbor_hex)?;
        let key = CallKey::NewTx(tx_id.clone());
        let rx = self.inner.register(key.clone())?;
        let command = ClientCommand::NewTx {
            transaction: transaction.clone(),
        };
        if let Err(e) = self.inner.transport.send(command.to_json()).await {
            self.inner.abandon(&key);
            return Err(e.into());
        }
        await_completion(rx).await?;
        Ok(tx_id)
    }

    /// Close the head, re-sending the command until `HeadIsClosed`
    pub async fn close(&self) -> Result<(), NodeError> {
        self.resend_until_terminal(CallKey::Close, ClientCommand::Close)
            .await
    }

    /// Fan the final UTxO set out to L1, re-sending until `HeadIsFinalized`
    pub async fn fanout(&self) -> Result<(), NodeError> {
        self.resend_until_terminal(CallKey::Fanout, ClientCommand::Fanout)
            .await
    }

    async fn resend_until_terminal(
        &self,
        key: CallKey,
        command: ClientCommand,
    ) -> Result<(), NodeError> {
        let mut rx = self.inner.register(key.clone())?;
        let payload = command.to_json();
        if let Err(e) = self.inner.transport.send(payload.clone()).await {
            self.inner.abandon(&key);
            return Err(e.into());
        }
        let start = tokio::time::Instant::now() + self.inner.resend_interval;
        let mut resend = tokio::time::interval_at(start, self.inner.resend_interval);
        loop {
            tokio::select! {
                result = &mut rx => {
                    return result.unwrap_or(Err(NodeError::Abandoned));
                }
                _ = resend.tick() => {
                    tracing::debug!(node = %self.inner.name, command = key.command_name(),
                        "no terminal event yet, re-sending");
                    if let Err(e) = self.inner.transport.send(payload.clone()).await {
                        // transient; the reconnect path settles the call
                        tracing::warn!(node = %self.inner.name, error = %e, "re-send failed");
                    }
                }
            }
        }
    }

    /// Poll the confirmed-tx ring until `tx_hash` shows up.
    ///
    /// No internal timeout: callers wrap this with their own deadline.
    pub async fn await_tx(&self, tx_hash: &str, poll_interval: Duration) -> bool {
        loop {
            if self.inner.confirmed.lock().contains(tx_hash) {
                return true;
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Request a commit transaction for this participant's UTxOs.
    ///
    /// Returns the unsigned envelope; a non-empty commit must be signed by
    /// the participant before submission.
    pub async fn commit(
        &self,
        utxos: &[Utxo],
        blueprint_tx: Option<&str>,
    ) -> Result<TxEnvelope, NodeError> {
        let body = match blueprint_tx {
            Some(blueprint) => {
                let utxo = commit_utxo_map(utxos, true)?;
                serde_json::json!({
                    "blueprintTx": {
                        "cborHex": blueprint,
                        "description": "",
                        "type": "Tx ConwayEra",
                    },
                    "utxo": utxo,
                })
            }
            None => commit_utxo_map(utxos, false)?,
        };
        let response = self
            .inner
            .http
            .post(format!("{}/commit", self.inner.http_url))
            .json(&body)
            .send()
            .await?;
        decode_response(response).await
    }

    /// Submit a (signed) commit transaction to L1 through the node
    pub async fn cardano_transaction(
        &self,
        transaction: &TxEnvelope,
    ) -> Result<serde_json::Value, NodeError> {
        let response = self
            .inner
            .http
            .post(format!("{}/cardano-transaction", self.inner.http_url))
            .json(transaction)
            .send()
            .await?;
        decode_response(response).await
    }

    pub async fn protocol_parameters(&self) -> Result<ProtocolParameters, NodeError> {
        let response = self
            .inner
            .http
            .get(format!("{}/protocol-parameters", self.inner.http_url))
            .send()
            .await?;
        let wire: ProtocolParametersResponse = decode_response(response).await?;
        wire.try_into()
    }

    /// Latest confirmed UTxO set of the head
    pub async fn snapshot_utxo(&self) -> Result<Vec<Utxo>, NodeError> {
        let response = self
            .inner
            .http
            .get(format!("{}/snapshot/utxo", self.inner.http_url))
            .send()
            .await?;
        let wire: BTreeMap<String, UtxoResponseItem> = decode_response(response).await?;
        wire.into_iter()
            .map(|(key, item)| utxo_from_wire(&key, item))
            .collect()
    }
}

impl NodeInner {
    fn register(&self, key: CallKey) -> Result<oneshot::Receiver<Result<(), NodeError>>, NodeError> {
        let mut calls = self.calls.lock();
        // a closed sender means the caller dropped its receiver (gave up,
        // e.g. an external timeout); that slot must not block a retry
        if let Some(existing) = calls.get(&key) {
            if !existing.is_closed() {
                return Err(NodeError::CallInFlight(key.command_name()));
            }
        }
        let (tx, rx) = oneshot::channel();
        calls.insert(key, tx);
        Ok(rx)
    }

    fn abandon(&self, key: &CallKey) {
        self.calls.lock().remove(key);
    }

    fn complete(&self, key: &CallKey, result: Result<(), NodeError>) {
        if let Some(tx) = self.calls.lock().remove(key) {
            let _ = tx.send(result);
        }
    }

    fn on_message(&self, raw: &str) {
        let message: ServerMessage = match serde_json::from_str(raw) {
            Ok(message) => message,
            Err(_) => {
                tracing::debug!(node = %self.name, raw, "skipping unrecognized message");
                return;
            }
        };

        if let Some(status) = HeadStatus::from_message(&message) {
            if status != *self.status.borrow() {
                tracing::info!(node = %self.name, ?status, "head status changed");
                self.status.send_replace(status);
            }
        }

        match &message {
            ServerMessage::SnapshotConfirmed { snapshot } => {
                let mut ring = self.confirmed.lock();
                for tx_id in &snapshot.confirmed_transactions {
                    ring.push(tx_id.clone());
                }
            }
            ServerMessage::HeadIsInitializing => self.complete(&CallKey::Init, Ok(())),
            ServerMessage::HeadIsClosed => self.complete(&CallKey::Close, Ok(())),
            ServerMessage::HeadIsFinalized => self.complete(&CallKey::Fanout, Ok(())),
            ServerMessage::TxValid { transaction } => {
                self.complete(&CallKey::NewTx(transaction.tx_id.clone()), Ok(()))
            }
            ServerMessage::TxInvalid { transaction } => self.complete(
                &CallKey::NewTx(transaction.tx_id.clone()),
                Err(NodeError::TxRejected {
                    tx_id: transaction.tx_id.clone(),
                }),
            ),
            ServerMessage::CommandFailed { client_input } => {
                let failure = |command: &str| NodeError::CommandFailed {
                    command: command.to_string(),
                };
                match client_input.tag.as_str() {
                    "Init" => self.complete(&CallKey::Init, Err(failure("Init"))),
                    "Close" => self.complete(&CallKey::Close, Err(failure("Close"))),
                    "Fanout" => self.complete(&CallKey::Fanout, Err(failure("Fanout"))),
                    "NewTx" => {
                        if let Some(tx) = &client_input.transaction {
                            self.complete(&CallKey::NewTx(tx.tx_id.clone()), Err(failure("NewTx")));
                        }
                    }
                    other => tracing::debug!(node = %self.name, command = other,
                        "command failure for a command this client never sends"),
                }
            }
            ServerMessage::PostTxOnChainFailed {
                post_chain_tx,
                post_tx_error,
            } => {
                let key = match post_chain_tx.tag.as_str() {
                    "InitTx" => Some(CallKey::Init),
                    "CloseTx" => Some(CallKey::Close),
                    "FanoutTx" => Some(CallKey::Fanout),
                    _ => None,
                };
                if let Some(key) = key {
                    self.complete(
                        &key,
                        Err(NodeError::PostTxFailed {
                            tag: post_chain_tx.tag.clone(),
                            detail: post_tx_error.to_string(),
                        }),
                    );
                }
            }
            _ => {}
        }
    }

    /// The connection dropped: every in-flight correlated call is stale
    fn on_reset(&self) {
        let pending: Vec<_> = {
            let mut calls = self.calls.lock();
            calls.drain().collect()
        };
        if !pending.is_empty() {
            tracing::warn!(node = %self.name, count = pending.len(),
                "failing in-flight calls after connection reset");
        }
        for (_, tx) in pending {
            let _ = tx.send(Err(NodeError::ConnectionReset));
        }
    }

    fn apply_connection_state(&self, state: ConnectionState) {
        let status = match state {
            ConnectionState::Disconnected => HeadStatus::Disconnected,
            ConnectionState::Connecting => HeadStatus::Connecting,
            ConnectionState::Connected => {
                // head state arrives with the next Greetings
                let current = *self.status.borrow();
                if matches!(current, HeadStatus::Disconnected | HeadStatus::Connecting) {
                    HeadStatus::Connected
                } else {
                    return;
                }
            }
        };
        if status != *self.status.borrow() {
            self.status.send_replace(status);
        }
    }
}

async fn demux(inner: Arc<NodeInner>, mut events: broadcast::Receiver<TransportEvent>) {
    loop {
        match events.recv().await {
            Ok(TransportEvent::Message(raw)) => inner.on_message(&raw),
            Ok(TransportEvent::Reset) => inner.on_reset(),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(node = %inner.name, missed = n, "demux lagged behind the stream");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn track_connection(
    inner: Arc<NodeInner>,
    mut state: watch::Receiver<ConnectionState>,
) {
    loop {
        let current = *state.borrow_and_update();
        inner.apply_connection_state(current);
        if state.changed().await.is_err() {
            break;
        }
    }
}

async fn await_completion(
    rx: oneshot::Receiver<Result<(), NodeError>>,
) -> Result<(), NodeError> {
    rx.await.unwrap_or(Err(NodeError::Abandoned))
}

/// Parse an HTTP response body as JSON; on failure surface the raw body
async fn decode_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, NodeError> {
    let status = response.status();
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|_| NodeError::NodeResponse { status, body })
}

/// A token quantity as a JSON number. JSON integers cover i64 and u64;
/// anything beyond is an error rather than a silent truncation.
fn quantity_json(unit: &str, quantity: i128) -> Result<serde_json::Value, NodeError> {
    if let Ok(q) = i64::try_from(quantity) {
        return Ok(q.into());
    }
    if let Ok(q) = u64::try_from(quantity) {
        return Ok(q.into());
    }
    Err(NodeError::QuantityOutOfRange {
        unit: unit.to_string(),
        quantity,
    })
}

fn wire_quantity(unit: &str, quantity: &serde_json::Value) -> Result<i128, NodeError> {
    if let Some(q) = quantity.as_i64() {
        return Ok(q as i128);
    }
    if let Some(q) = quantity.as_u64() {
        return Ok(q as i128);
    }
    Err(NodeError::NodeResponse {
        status: reqwest::StatusCode::OK,
        body: format!("bad quantity for {unit}: {quantity}"),
    })
}

fn commit_utxo_map(utxos: &[Utxo], blueprint: bool) -> Result<serde_json::Value, NodeError> {
    let mut map = serde_json::Map::new();
    for utxo in utxos {
        let key = format!("{}#{}", utxo.tx_hash, utxo.output_index);
        let mut value = serde_json::Map::new();
        for (unit, quantity) in utxo.assets.iter() {
            value.insert(unit.clone(), quantity_json(unit, *quantity)?);
        }
        let entry = if blueprint {
            serde_json::json!({
                "address": utxo.address,
                "datum": utxo.datum,
                "datumhash": utxo.datum_hash,
                "inlineDatum": null,
                "inlineDatumRaw": null,
                "referenceScript": null,
                "value": value,
            })
        } else {
            serde_json::json!({
                "address": utxo.address,
                "datum": utxo.datum,
                "datumHash": utxo.datum_hash,
                "inlineDatum": utxo.datum,
                "value": value,
            })
        };
        map.insert(key, entry);
    }
    Ok(serde_json::Value::Object(map))
}

// --- node wire schemas ---

#[derive(Debug, Deserialize)]
struct ExecutionUnitPricesResponse {
    #[serde(rename = "priceMemory")]
    price_memory: f64,
    #[serde(rename = "priceSteps")]
    price_steps: f64,
}

#[derive(Debug, Deserialize)]
struct MaxTxExecutionUnitsResponse {
    memory: String,
    steps: String,
}

#[derive(Debug, Deserialize)]
struct CostModelsResponse {
    #[serde(rename = "PlutusV1", default)]
    plutus_v1: Vec<i64>,
    #[serde(rename = "PlutusV2", default)]
    plutus_v2: Vec<i64>,
    #[serde(rename = "PlutusV3", default)]
    plutus_v3: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct ProtocolParametersResponse {
    #[serde(rename = "txFeePerByte")]
    tx_fee_per_byte: u64,
    #[serde(rename = "txFeeFixed")]
    tx_fee_fixed: u64,
    #[serde(rename = "maxTxSize")]
    max_tx_size: u64,
    #[serde(rename = "maxValueSize")]
    max_value_size: u64,
    #[serde(rename = "stakeAddressDeposit")]
    stake_address_deposit: String,
    #[serde(rename = "stakePoolDeposit")]
    stake_pool_deposit: String,
    #[serde(rename = "dRepDeposit")]
    drep_deposit: String,
    #[serde(rename = "govActionDeposit")]
    gov_action_deposit: String,
    #[serde(rename = "executionUnitPrices")]
    execution_unit_prices: ExecutionUnitPricesResponse,
    #[serde(rename = "maxTxExecutionUnits")]
    max_tx_execution_units: MaxTxExecutionUnitsResponse,
    #[serde(rename = "utxoCostPerByte")]
    utxo_cost_per_byte: String,
    #[serde(rename = "collateralPercentage")]
    collateral_percentage: u64,
    #[serde(rename = "maxCollateralInputs")]
    max_collateral_inputs: u64,
    #[serde(rename = "minFeeRefScriptCostPerByte")]
    min_fee_ref_script_cost_per_byte: f64,
    #[serde(rename = "costModels")]
    cost_models: CostModelsResponse,
}

fn parse_big(field: &'static str, value: &str) -> Result<u128, NodeError> {
    value.parse().map_err(|_| NodeError::NodeResponse {
        status: reqwest::StatusCode::OK,
        body: format!("non-numeric {field}: {value}"),
    })
}

fn index_keyed(costs: Vec<i64>) -> BTreeMap<String, i64> {
    costs
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i.to_string(), v))
        .collect()
}

impl TryFrom<ProtocolParametersResponse> for ProtocolParameters {
    type Error = NodeError;

    fn try_from(wire: ProtocolParametersResponse) -> Result<Self, NodeError> {
        Ok(ProtocolParameters {
            min_fee_a: wire.tx_fee_per_byte,
            min_fee_b: wire.tx_fee_fixed,
            max_tx_size: wire.max_tx_size,
            max_val_size: wire.max_value_size,
            key_deposit: parse_big("stakeAddressDeposit", &wire.stake_address_deposit)?,
            pool_deposit: parse_big("stakePoolDeposit", &wire.stake_pool_deposit)?,
            drep_deposit: parse_big("dRepDeposit", &wire.drep_deposit)?,
            gov_action_deposit: parse_big("govActionDeposit", &wire.gov_action_deposit)?,
            price_mem: wire.execution_unit_prices.price_memory,
            price_step: wire.execution_unit_prices.price_steps,
            max_tx_ex_mem: parse_big("maxTxExecutionUnits.memory", &wire.max_tx_execution_units.memory)?,
            max_tx_ex_steps: parse_big("maxTxExecutionUnits.steps", &wire.max_tx_execution_units.steps)?,
            coins_per_utxo_byte: parse_big("utxoCostPerByte", &wire.utxo_cost_per_byte)?,
            collateral_percentage: wire.collateral_percentage,
            max_collateral_inputs: wire.max_collateral_inputs,
            min_fee_ref_script_cost_per_byte: wire.min_fee_ref_script_cost_per_byte,
            cost_models: CostModels {
                plutus_v1: index_keyed(wire.cost_models.plutus_v1),
                plutus_v2: index_keyed(wire.cost_models.plutus_v2),
                plutus_v3: index_keyed(wire.cost_models.plutus_v3),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct UtxoResponseItem {
    address: String,
    #[serde(default)]
    datum: Option<String>,
    #[serde(rename = "datumHash", default)]
    datum_hash: Option<String>,
    value: BTreeMap<String, serde_json::Value>,
}

fn utxo_from_wire(key: &str, item: UtxoResponseItem) -> Result<Utxo, NodeError> {
    let bad_key = || NodeError::NodeResponse {
        status: reqwest::StatusCode::OK,
        body: format!("malformed utxo key: {key}"),
    };
    let (tx_hash, output_index) = key.split_once('#').ok_or_else(bad_key)?;
    let output_index: u64 = output_index.parse().map_err(|_| bad_key())?;

    let mut assets = Assets::new();
    for (unit, value) in item.value {
        match value {
            quantity @ serde_json::Value::Number(_) => {
                let quantity = wire_quantity(&unit, &quantity)?;
                let unit = if unit == LOVELACE {
                    LOVELACE.to_string()
                } else {
                    unit
                };
                assets.insert(unit, quantity);
            }
            serde_json::Value::Object(tokens) => {
                for (asset_name, quantity) in tokens {
                    let quantity = wire_quantity(&unit, &quantity)?;
                    assets.insert(format!("{unit}{asset_name}"), quantity);
                }
            }
            _ => {}
        }
    }

    Ok(Utxo {
        tx_hash: tx_hash.to_string(),
        output_index,
        address: item.address,
        assets,
        datum: item.datum,
        datum_hash: item.datum_hash,
        script_ref: None,
    })
}

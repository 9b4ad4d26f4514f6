//! Typed views over the head validators' on-chain datums and redeemers.
//!
//! Field order and constructor indices must match the validator layout
//! exactly; every type here round-trips through [`crate::plutus::Data`].

use crate::plutus::{CborError, Data};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatumError {
    #[error("cbor: {0}")]
    Cbor(#[from] CborError),
    #[error("unexpected datum shape: expected {0}")]
    Shape(&'static str),
    #[error("integer field out of range")]
    IntRange,
    #[error("staking pointer addresses are not supported")]
    StakingPointer,
    #[error("reference scripts in fanout outputs are not supported")]
    ReferenceScript,
    #[error("multiple tokens under one currency symbol")]
    MultipleTokens,
}

/// Contestation period, stored on chain in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContestationPeriod {
    pub milliseconds: u64,
}

/// Reference to the output a commit consumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRef {
    pub tx_out_ref_id: Vec<u8>,
    pub tx_out_ref_idx: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialDatum {
    pub contestation_period: ContestationPeriod,
    pub parties: Vec<Vec<u8>>,
    pub head_id: Vec<u8>,
    pub seed: OutputRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDatum {
    pub head_id: Vec<u8>,
    pub parties: Vec<Vec<u8>>,
    pub contestation_period: ContestationPeriod,
    pub version: u64,
    pub utxo_hash: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedDatum {
    pub head_id: Vec<u8>,
    pub parties: Vec<Vec<u8>>,
    pub contestation_period: ContestationPeriod,
    pub version: u64,
    pub snapshot_number: u64,
    pub utxo_hash: Vec<u8>,
    pub alpha_utxo_hash: Vec<u8>,
    pub omega_utxo_hash: Vec<u8>,
    pub contesters: Vec<Vec<u8>>,
    /// POSIX milliseconds
    pub contestation_deadline: u64,
}

/// Head lifecycle state as stored in the head script's inline datum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadStateDatum {
    Initial(InitialDatum),
    Open(OpenDatum),
    Closed(ClosedDatum),
    Final,
}

impl HeadStateDatum {
    pub fn state_name(&self) -> &'static str {
        match self {
            HeadStateDatum::Initial(_) => "Initial",
            HeadStateDatum::Open(_) => "Open",
            HeadStateDatum::Closed(_) => "Closed",
            HeadStateDatum::Final => "Final",
        }
    }

    pub fn from_hex(datum: &str) -> Result<Self, DatumError> {
        Self::from_data(&Data::from_hex(datum)?)
    }

    pub fn to_hex(&self) -> Result<String, DatumError> {
        Ok(self.to_data().to_hex()?)
    }

    pub fn from_data(data: &Data) -> Result<Self, DatumError> {
        let (alt, fields) = as_constr(data, "head state")?;
        match alt {
            0 => {
                let [cp, parties, head_id, seed] = expect_fields(fields, "Initial")?;
                Ok(HeadStateDatum::Initial(InitialDatum {
                    contestation_period: contestation_period(cp)?,
                    parties: as_bytes_list(parties)?,
                    head_id: as_bytes(head_id)?,
                    seed: output_ref(seed)?,
                }))
            }
            1 => {
                let [inner] = expect_fields(fields, "Open")?;
                let (inner_alt, inner_fields) = as_constr(inner, "Open record")?;
                if inner_alt != 0 {
                    return Err(DatumError::Shape("Open record"));
                }
                let [head_id, parties, cp, version, hash] =
                    expect_fields(inner_fields, "Open record")?;
                Ok(HeadStateDatum::Open(OpenDatum {
                    head_id: as_bytes(head_id)?,
                    parties: as_bytes_list(parties)?,
                    contestation_period: contestation_period(cp)?,
                    version: as_u64(version)?,
                    utxo_hash: as_bytes(hash)?,
                }))
            }
            2 => {
                let [inner] = expect_fields(fields, "Closed")?;
                let (inner_alt, inner_fields) = as_constr(inner, "Closed record")?;
                if inner_alt != 0 {
                    return Err(DatumError::Shape("Closed record"));
                }
                let [head_id, parties, cp, version, snapshot, utxo, alpha, omega, contesters, deadline] =
                    expect_fields(inner_fields, "Closed record")?;
                Ok(HeadStateDatum::Closed(ClosedDatum {
                    head_id: as_bytes(head_id)?,
                    parties: as_bytes_list(parties)?,
                    contestation_period: contestation_period(cp)?,
                    version: as_u64(version)?,
                    snapshot_number: as_u64(snapshot)?,
                    utxo_hash: as_bytes(utxo)?,
                    alpha_utxo_hash: as_bytes(alpha)?,
                    omega_utxo_hash: as_bytes(omega)?,
                    contesters: as_bytes_list(contesters)?,
                    contestation_deadline: as_u64(deadline)?,
                }))
            }
            3 => {
                if !fields.is_empty() {
                    return Err(DatumError::Shape("Final"));
                }
                Ok(HeadStateDatum::Final)
            }
            _ => Err(DatumError::Shape("head state alternative")),
        }
    }

    pub fn to_data(&self) -> Data {
        match self {
            HeadStateDatum::Initial(d) => Data::constr(
                0,
                vec![
                    cp_data(d.contestation_period),
                    bytes_list(&d.parties),
                    Data::bytes(d.head_id.clone()),
                    Data::constr(
                        0,
                        vec![
                            Data::bytes(d.seed.tx_out_ref_id.clone()),
                            Data::int(d.seed.tx_out_ref_idx as i128),
                        ],
                    ),
                ],
            ),
            HeadStateDatum::Open(d) => Data::constr(
                1,
                vec![Data::constr(
                    0,
                    vec![
                        Data::bytes(d.head_id.clone()),
                        bytes_list(&d.parties),
                        cp_data(d.contestation_period),
                        Data::int(d.version as i128),
                        Data::bytes(d.utxo_hash.clone()),
                    ],
                )],
            ),
            HeadStateDatum::Closed(d) => Data::constr(
                2,
                vec![Data::constr(
                    0,
                    vec![
                        Data::bytes(d.head_id.clone()),
                        bytes_list(&d.parties),
                        cp_data(d.contestation_period),
                        Data::int(d.version as i128),
                        Data::int(d.snapshot_number as i128),
                        Data::bytes(d.utxo_hash.clone()),
                        Data::bytes(d.alpha_utxo_hash.clone()),
                        Data::bytes(d.omega_utxo_hash.clone()),
                        bytes_list(&d.contesters),
                        Data::int(d.contestation_deadline as i128),
                    ],
                )],
            ),
            HeadStateDatum::Final => Data::constr(3, vec![]),
        }
    }
}

/// Redeemer for the Close input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseRedeemer {
    CloseInitial,
    CloseAny { signature: Vec<Vec<u8>> },
}

impl CloseRedeemer {
    pub fn to_data(&self) -> Data {
        match self {
            CloseRedeemer::CloseInitial => Data::constr(0, vec![]),
            CloseRedeemer::CloseAny { signature } => {
                Data::constr(1, vec![bytes_list(signature)])
            }
        }
    }
}

/// Redeemer for spending the head script input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRedeemer {
    CollectCom,
    Increment,
    Decrement,
    Close(CloseRedeemer),
    Fanout {
        fanout_outputs: u64,
        commit_outputs: u64,
        decommit_outputs: u64,
    },
}

impl InputRedeemer {
    pub fn to_data(&self) -> Data {
        match self {
            InputRedeemer::CollectCom => Data::constr(0, vec![]),
            InputRedeemer::Increment => Data::constr(1, vec![]),
            InputRedeemer::Decrement => Data::constr(2, vec![]),
            InputRedeemer::Close(inner) => Data::constr(3, vec![inner.to_data()]),
            InputRedeemer::Fanout {
                fanout_outputs,
                commit_outputs,
                decommit_outputs,
            } => Data::constr(
                4,
                vec![
                    Data::int(*fanout_outputs as i128),
                    Data::int(*commit_outputs as i128),
                    Data::int(*decommit_outputs as i128),
                ],
            ),
        }
    }

    pub fn to_hex(&self) -> Result<String, DatumError> {
        Ok(self.to_data().to_hex()?)
    }
}

/// Redeemer burning the head's policy tokens
pub fn burn_redeemer() -> Data {
    Data::constr(1, vec![])
}

/// One committed output inside a commit datum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub input: OutputRef,
    pub pre_serialized_output: Vec<u8>,
}

/// Datum locked at the commit script, one per party
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectCommitDatum {
    pub party: Vec<u8>,
    pub commits: Vec<Commit>,
    pub head_id: Vec<u8>,
}

impl CollectCommitDatum {
    pub fn from_hex(datum: &str) -> Result<Self, DatumError> {
        Self::from_data(&Data::from_hex(datum)?)
    }

    pub fn from_data(data: &Data) -> Result<Self, DatumError> {
        let (alt, fields) = as_constr(data, "commit datum")?;
        if alt != 0 {
            return Err(DatumError::Shape("commit datum"));
        }
        let [party, commits, head_id] = expect_fields(fields, "commit datum")?;
        let commits = as_list(commits)?
            .iter()
            .map(|c| {
                let (alt, fields) = as_constr(c, "commit entry")?;
                if alt != 0 {
                    return Err(DatumError::Shape("commit entry"));
                }
                let [input, output] = expect_fields(fields, "commit entry")?;
                Ok(Commit {
                    input: output_ref(input)?,
                    pre_serialized_output: as_bytes(output)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CollectCommitDatum {
            party: as_bytes(party)?,
            commits,
            head_id: as_bytes(head_id)?,
        })
    }

    pub fn to_data(&self) -> Data {
        Data::constr(
            0,
            vec![
                Data::bytes(self.party.clone()),
                Data::List(
                    self.commits
                        .iter()
                        .map(|c| {
                            Data::constr(
                                0,
                                vec![
                                    Data::constr(
                                        0,
                                        vec![
                                            Data::bytes(c.input.tx_out_ref_id.clone()),
                                            Data::int(c.input.tx_out_ref_idx as i128),
                                        ],
                                    ),
                                    Data::bytes(c.pre_serialized_output.clone()),
                                ],
                            )
                        })
                        .collect(),
                ),
                Data::bytes(self.head_id.clone()),
            ],
        )
    }
}

/// Payment or staking credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    PubKey(Vec<u8>),
    Script(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakingCredential {
    Credential(Credential),
    Pointer(u64, u64, u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlutusAddress {
    pub payment: Credential,
    pub staking: Option<StakingCredential>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlutusOutputDatum {
    None,
    Hash(Vec<u8>),
    Inline(Vec<u8>),
}

/// A transaction output as pre-serialized inside a commit datum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlutusTxOut {
    pub address: PlutusAddress,
    /// currency symbol -> (token name -> quantity)
    pub value: Vec<(Vec<u8>, Vec<(Vec<u8>, i128)>)>,
    pub datum: PlutusOutputDatum,
    pub reference_script: Option<Vec<u8>>,
}

impl PlutusTxOut {
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, DatumError> {
        Self::from_data(&Data::from_cbor(bytes)?)
    }

    pub fn from_data(data: &Data) -> Result<Self, DatumError> {
        let (alt, fields) = as_constr(data, "tx out")?;
        if alt != 0 {
            return Err(DatumError::Shape("tx out"));
        }
        let [address, value, datum, reference_script] = expect_fields(fields, "tx out")?;
        Ok(PlutusTxOut {
            address: plutus_address(address)?,
            value: plutus_value(value)?,
            datum: output_datum(datum)?,
            reference_script: maybe_bytes(reference_script)?,
        })
    }

    /// Flatten the Plutus value into asset units.
    ///
    /// At most one token per currency symbol is representable; more is a
    /// validation error, matching the fanout restriction.
    pub fn assets(&self) -> Result<crate::types::Assets, DatumError> {
        let mut assets = crate::types::Assets::new();
        for (symbol, tokens) in &self.value {
            if tokens.len() > 1 {
                return Err(DatumError::MultipleTokens);
            }
            for (name, quantity) in tokens {
                let unit = if symbol.is_empty() {
                    crate::types::LOVELACE.to_string()
                } else {
                    format!("{}{}", hex::encode(symbol), hex::encode(name))
                };
                if assets.insert(unit, *quantity).is_some() {
                    return Err(DatumError::MultipleTokens);
                }
            }
        }
        Ok(assets)
    }
}

// --- decoding helpers ---

fn as_constr<'a>(data: &'a Data, what: &'static str) -> Result<(u64, &'a [Data]), DatumError> {
    match data {
        Data::Constr(alt, fields) => Ok((*alt, fields)),
        _ => Err(DatumError::Shape(what)),
    }
}

fn expect_fields<'a, const N: usize>(
    fields: &'a [Data],
    what: &'static str,
) -> Result<[&'a Data; N], DatumError> {
    if fields.len() != N {
        return Err(DatumError::Shape(what));
    }
    let mut out = [&fields[0]; N];
    for (slot, field) in out.iter_mut().zip(fields.iter()) {
        *slot = field;
    }
    Ok(out)
}

fn as_bytes(data: &Data) -> Result<Vec<u8>, DatumError> {
    match data {
        Data::Bytes(b) => Ok(b.clone()),
        _ => Err(DatumError::Shape("bytes")),
    }
}

fn as_list(data: &Data) -> Result<&[Data], DatumError> {
    match data {
        Data::List(items) => Ok(items),
        _ => Err(DatumError::Shape("list")),
    }
}

fn as_bytes_list(data: &Data) -> Result<Vec<Vec<u8>>, DatumError> {
    as_list(data)?.iter().map(as_bytes).collect()
}

fn as_u64(data: &Data) -> Result<u64, DatumError> {
    match data {
        Data::Int(i) if *i >= 0 && *i <= u64::MAX as i128 => Ok(*i as u64),
        Data::Int(_) => Err(DatumError::IntRange),
        _ => Err(DatumError::Shape("integer")),
    }
}

fn contestation_period(data: &Data) -> Result<ContestationPeriod, DatumError> {
    let (alt, fields) = as_constr(data, "contestation period")?;
    if alt != 0 {
        return Err(DatumError::Shape("contestation period"));
    }
    let [ms] = expect_fields(fields, "contestation period")?;
    Ok(ContestationPeriod {
        milliseconds: as_u64(ms)?,
    })
}

fn cp_data(cp: ContestationPeriod) -> Data {
    Data::constr(0, vec![Data::int(cp.milliseconds as i128)])
}

fn bytes_list(items: &[Vec<u8>]) -> Data {
    Data::List(items.iter().cloned().map(Data::Bytes).collect())
}

fn output_ref(data: &Data) -> Result<OutputRef, DatumError> {
    let (alt, fields) = as_constr(data, "output ref")?;
    if alt != 0 {
        return Err(DatumError::Shape("output ref"));
    }
    let [id, idx] = expect_fields(fields, "output ref")?;
    Ok(OutputRef {
        tx_out_ref_id: as_bytes(id)?,
        tx_out_ref_idx: as_u64(idx)?,
    })
}

fn credential(data: &Data) -> Result<Credential, DatumError> {
    let (alt, fields) = as_constr(data, "credential")?;
    let [hash] = expect_fields(fields, "credential")?;
    match alt {
        0 => Ok(Credential::PubKey(as_bytes(hash)?)),
        1 => Ok(Credential::Script(as_bytes(hash)?)),
        _ => Err(DatumError::Shape("credential")),
    }
}

fn plutus_address(data: &Data) -> Result<PlutusAddress, DatumError> {
    let (alt, fields) = as_constr(data, "address")?;
    if alt != 0 {
        return Err(DatumError::Shape("address"));
    }
    let [payment, staking] = expect_fields(fields, "address")?;
    let staking = {
        let (alt, fields) = as_constr(staking, "maybe staking credential")?;
        match alt {
            0 => {
                let [inner] = expect_fields(fields, "staking credential")?;
                let (alt, fields) = as_constr(inner, "staking credential")?;
                match alt {
                    0 => {
                        let [cred] = expect_fields(fields, "staking credential")?;
                        Some(StakingCredential::Credential(credential(cred)?))
                    }
                    1 => {
                        let [a, b, c] = expect_fields(fields, "staking pointer")?;
                        Some(StakingCredential::Pointer(
                            as_u64(a)?,
                            as_u64(b)?,
                            as_u64(c)?,
                        ))
                    }
                    _ => return Err(DatumError::Shape("staking credential")),
                }
            }
            1 => None,
            _ => return Err(DatumError::Shape("maybe staking credential")),
        }
    };
    Ok(PlutusAddress {
        payment: credential(payment)?,
        staking,
    })
}

fn plutus_value(data: &Data) -> Result<Vec<(Vec<u8>, Vec<(Vec<u8>, i128)>)>, DatumError> {
    let entries = match data {
        Data::Map(entries) => entries,
        _ => return Err(DatumError::Shape("value")),
    };
    entries
        .iter()
        .map(|(symbol, tokens)| {
            let tokens = match tokens {
                Data::Map(tokens) => tokens,
                _ => return Err(DatumError::Shape("value tokens")),
            };
            let tokens = tokens
                .iter()
                .map(|(name, quantity)| {
                    let quantity = match quantity {
                        Data::Int(i) => *i,
                        _ => return Err(DatumError::Shape("token quantity")),
                    };
                    Ok((as_bytes(name)?, quantity))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((as_bytes(symbol)?, tokens))
        })
        .collect()
}

fn output_datum(data: &Data) -> Result<PlutusOutputDatum, DatumError> {
    let (alt, fields) = as_constr(data, "output datum")?;
    match (alt, fields) {
        (0, []) => Ok(PlutusOutputDatum::None),
        (1, [hash]) => Ok(PlutusOutputDatum::Hash(as_bytes(hash)?)),
        (2, [inline]) => Ok(PlutusOutputDatum::Inline(as_bytes(inline)?)),
        _ => Err(DatumError::Shape("output datum")),
    }
}

fn maybe_bytes(data: &Data) -> Result<Option<Vec<u8>>, DatumError> {
    let (alt, fields) = as_constr(data, "maybe")?;
    match (alt, fields) {
        (0, [inner]) => Ok(Some(as_bytes(inner)?)),
        (1, []) => Ok(None),
        _ => Err(DatumError::Shape("maybe")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_initial() -> HeadStateDatum {
        HeadStateDatum::Initial(InitialDatum {
            contestation_period: ContestationPeriod {
                milliseconds: 60_000,
            },
            parties: vec![vec![0x11, 0x22]],
            head_id: vec![0xaa, 0xbb, 0xcc],
            seed: OutputRef {
                tx_out_ref_id: vec![0xde, 0xad, 0xbe, 0xef],
                tx_out_ref_idx: 1,
            },
        })
    }

    fn sample_open() -> HeadStateDatum {
        HeadStateDatum::Open(OpenDatum {
            head_id: vec![0xaa, 0xbb, 0xcc],
            parties: vec![vec![0x11, 0x22]],
            contestation_period: ContestationPeriod {
                milliseconds: 60_000,
            },
            version: 0,
            utxo_hash: vec![0x01, 0x02, 0x03, 0x04],
        })
    }

    fn sample_closed() -> HeadStateDatum {
        HeadStateDatum::Closed(ClosedDatum {
            head_id: vec![0xaa, 0xbb, 0xcc],
            parties: vec![vec![0x11, 0x22]],
            contestation_period: ContestationPeriod {
                milliseconds: 60_000,
            },
            version: 0,
            snapshot_number: 0,
            utxo_hash: vec![0x01, 0x02, 0x03, 0x04],
            alpha_utxo_hash: vec![0x01, 0x02, 0x03, 0x04],
            omega_utxo_hash: vec![0x01, 0x02, 0x03, 0x04],
            contesters: vec![],
            contestation_deadline: 120_000,
        })
    }

    const INITIAL_HEX: &str = "d8799fd8799f19ea60ff9f421122ff43aabbccd8799f44deadbeef01ffff";
    const OPEN_HEX: &str = "d87a9fd8799f43aabbcc9f421122ffd8799f19ea60ff004401020304ffff";
    const CLOSED_HEX: &str =
        "d87b9fd8799f43aabbcc9f421122ffd8799f19ea60ff000044010203044401020304440102030480\
         1a0001d4c0ffff";

    #[test]
    fn initial_datum_round_trips_byte_exact() {
        assert_eq!(sample_initial().to_hex().unwrap(), INITIAL_HEX);
        let decoded = HeadStateDatum::from_hex(INITIAL_HEX).unwrap();
        assert_eq!(decoded, sample_initial());
        assert_eq!(decoded.to_hex().unwrap(), INITIAL_HEX);
    }

    #[test]
    fn open_datum_round_trips_byte_exact() {
        assert_eq!(sample_open().to_hex().unwrap(), OPEN_HEX);
        let decoded = HeadStateDatum::from_hex(OPEN_HEX).unwrap();
        assert_eq!(decoded, sample_open());
        assert_eq!(decoded.to_hex().unwrap(), OPEN_HEX);
    }

    #[test]
    fn closed_datum_round_trips_byte_exact() {
        assert_eq!(sample_closed().to_hex().unwrap(), CLOSED_HEX);
        let decoded = HeadStateDatum::from_hex(CLOSED_HEX).unwrap();
        assert_eq!(decoded, sample_closed());
        assert_eq!(decoded.to_hex().unwrap(), CLOSED_HEX);
    }

    #[test]
    fn final_datum_is_bare_constructor() {
        assert_eq!(HeadStateDatum::Final.to_hex().unwrap(), "d87c80");
        assert_eq!(
            HeadStateDatum::from_hex("d87c80").unwrap(),
            HeadStateDatum::Final
        );
    }

    #[test]
    fn close_initial_redeemer_layout() {
        let redeemer = InputRedeemer::Close(CloseRedeemer::CloseInitial);
        assert_eq!(redeemer.to_hex().unwrap(), "d87c9fd87980ff");
    }

    #[test]
    fn fanout_redeemer_layout() {
        let redeemer = InputRedeemer::Fanout {
            fanout_outputs: 3,
            commit_outputs: 0,
            decommit_outputs: 0,
        };
        assert_eq!(redeemer.to_hex().unwrap(), "d87d9f030000ff");
    }

    #[test]
    fn collect_commit_datum_round_trips() {
        let datum = CollectCommitDatum {
            party: vec![0x11],
            commits: vec![Commit {
                input: OutputRef {
                    tx_out_ref_id: vec![0xde, 0xad],
                    tx_out_ref_idx: 0,
                },
                pre_serialized_output: vec![0xd8, 0x79],
            }],
            head_id: vec![0xaa],
        };
        let data = datum.to_data();
        assert_eq!(CollectCommitDatum::from_data(&data).unwrap(), datum);
    }

    #[test]
    fn tx_out_assets_flatten_and_reject_multi_tokens() {
        let out = PlutusTxOut {
            address: PlutusAddress {
                payment: Credential::PubKey(vec![0x01; 28]),
                staking: None,
            },
            value: vec![
                (vec![], vec![(vec![], 5_000_000)]),
                (vec![0xaa; 28], vec![(vec![0x01], 1)]),
            ],
            datum: PlutusOutputDatum::None,
            reference_script: None,
        };
        let assets = out.assets().unwrap();
        assert_eq!(assets["lovelace"], 5_000_000);
        assert_eq!(assets[&format!("{}01", hex::encode(vec![0xaa; 28]))], 1);

        let multi = PlutusTxOut {
            value: vec![(vec![0xaa; 28], vec![(vec![0x01], 1), (vec![0x02], 1)])],
            ..out
        };
        assert!(matches!(
            multi.assets(),
            Err(DatumError::MultipleTokens)
        ));
    }

    #[test]
    fn rejects_wrong_record_arity() {
        // Open wrapper holding a 4-field record
        let bad = Data::constr(
            1,
            vec![Data::constr(
                0,
                vec![
                    Data::bytes(vec![0xaa]),
                    Data::List(vec![]),
                    Data::constr(0, vec![Data::int(1)]),
                    Data::int(0),
                ],
            )],
        );
        assert!(HeadStateDatum::from_data(&bad).is_err());
    }
}

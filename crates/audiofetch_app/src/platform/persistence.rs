use audiofetch_core::{JobId, Msg};
use audiofetch_engine::{
    decode_ledger, write_ledger_union, DurableStore, StoreChange, CREDENTIAL_KEY, LEDGER_KEY,
};
use audiofetch_logging::{af_debug, af_error, af_info, af_warn};

/// Messages that put a fresh client in the state durable storage describes.
pub(crate) fn restore_messages(store: &dyn DurableStore) -> Vec<Msg> {
    let mut msgs = Vec::new();
    match store.get(CREDENTIAL_KEY) {
        Ok(Some(token)) if !token.is_empty() => {
            af_info!("Restored saved credential");
            msgs.push(Msg::CredentialSynced(Some(token)));
        }
        Ok(_) => {}
        Err(err) => af_warn!("Could not read saved credential: {err}"),
    }
    match store.get(LEDGER_KEY) {
        Ok(raw) => {
            let ids = decode_ledger(raw.as_deref());
            if !ids.is_empty() {
                af_info!("Restored {} auto-downloaded job ids", ids.len());
                msgs.push(Msg::LedgerSynced(ids));
            }
        }
        Err(err) => af_warn!("Could not read auto-download ledger: {err}"),
    }
    msgs
}

/// A write made by another client instance, as a message for this one.
pub(crate) fn change_to_msg(change: StoreChange) -> Option<Msg> {
    match change.key.as_str() {
        CREDENTIAL_KEY => Some(Msg::CredentialSynced(
            change.value.filter(|token| !token.is_empty()),
        )),
        LEDGER_KEY => Some(Msg::LedgerSynced(decode_ledger(change.value.as_deref()))),
        other => {
            af_debug!("Ignoring store change for {other}");
            None
        }
    }
}

/// Writes the ledger as a union with what is already stored. When another
/// instance had added entries this one has not seen, they come back as a
/// `LedgerSynced` message.
pub(crate) fn persist_ledger(store: &dyn DurableStore, job_ids: &[JobId]) -> Option<Msg> {
    match write_ledger_union(store, job_ids) {
        Ok(merged) => {
            if merged.len() > job_ids.len() {
                Some(Msg::LedgerSynced(merged))
            } else {
                None
            }
        }
        Err(err) => {
            af_error!("Failed to persist auto-download ledger: {err}");
            None
        }
    }
}

pub(crate) fn persist_credential(store: &dyn DurableStore, token: Option<&str>) {
    let result = match token {
        Some(token) => store.set(CREDENTIAL_KEY, token),
        None => store.remove(CREDENTIAL_KEY),
    };
    if let Err(err) = result {
        af_error!("Failed to persist credential: {err}");
    }
}

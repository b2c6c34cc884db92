//! Typed wrappers around the `jail.*` middleware calls.

use crate::client::Middleware;
use crate::error::MiddlewareError;
use crate::types::*;
use jailtab_mount::{FstabEntry, ObservedEntry};
use serde_json::{Value, json};

pub async fn get_iocroot<M: Middleware + ?Sized>(mw: &M) -> Result<String, MiddlewareError> {
    let value = mw.call(METHOD_GET_IOCROOT, vec![]).await?;
    match value {
        Value::String(root) if !root.is_empty() => Ok(root),
        other => Err(MiddlewareError::UnexpectedResponse(format!(
            "{} returned {}",
            METHOD_GET_IOCROOT, other
        ))),
    }
}

pub async fn list_fstab<M: Middleware + ?Sized>(
    mw: &M,
    jail: &str,
) -> Result<Vec<ObservedEntry>, MiddlewareError> {
    let value = mw
        .call(
            METHOD_FSTAB,
            vec![json!(jail), fstab_options(FstabAction::List, None, None)],
        )
        .await?;
    parse_fstab_listing(value)
}

pub async fn add_entry<M: Middleware + ?Sized>(
    mw: &M,
    jail: &str,
    entry: &FstabEntry,
) -> Result<Value, MiddlewareError> {
    mw.call(
        METHOD_FSTAB,
        vec![json!(jail), fstab_options(FstabAction::Add, None, Some(entry))],
    )
    .await
}

pub async fn replace_entry<M: Middleware + ?Sized>(
    mw: &M,
    jail: &str,
    id: &str,
    entry: &FstabEntry,
) -> Result<Value, MiddlewareError> {
    mw.call(
        METHOD_FSTAB,
        vec![
            json!(jail),
            fstab_options(FstabAction::Replace, Some(id), Some(entry)),
        ],
    )
    .await
}

pub async fn remove_entry<M: Middleware + ?Sized>(
    mw: &M,
    jail: &str,
    id: &str,
) -> Result<Value, MiddlewareError> {
    mw.call(
        METHOD_FSTAB,
        vec![json!(jail), fstab_options(FstabAction::Remove, Some(id), None)],
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jailtab_mount::Origin;
    use std::sync::Mutex;

    struct Canned {
        response: Value,
        calls: Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl Canned {
        fn new(response: Value) -> Self {
            Self {
                response,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Middleware for Canned {
        async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, MiddlewareError> {
            self.calls.lock().unwrap().push((method.to_string(), args));
            Ok(self.response.clone())
        }

        async fn job(&self, method: &str, args: Vec<Value>) -> Result<Value, MiddlewareError> {
            self.call(method, args).await
        }
    }

    #[tokio::test]
    async fn test_get_iocroot() {
        let mw = Canned::new(json!("/mnt/pool/iocage"));
        assert_eq!(get_iocroot(&mw).await.unwrap(), "/mnt/pool/iocage");

        let mw = Canned::new(json!(null));
        assert!(matches!(
            get_iocroot(&mw).await,
            Err(MiddlewareError::UnexpectedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_list_fstab() {
        let mw = Canned::new(json!({
            "0": {"type": "SYSTEM", "entry": ["/a", "/t/a", "nullfs", "ro", 0, 0]},
            "1": {"type": "USER", "entry": ["/b", "/t/b", "nullfs", "ro", 0, 0]}
        }));

        let entries = list_fstab(&mw, "j1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].origin, Origin::User);

        let calls = mw.calls.lock().unwrap();
        assert_eq!(calls[0].0, "jail.fstab");
        assert_eq!(calls[0].1, vec![json!("j1"), json!({"action": "LIST"})]);
    }

    #[tokio::test]
    async fn test_mutations_send_entry_and_id() {
        let mw = Canned::new(json!(true));
        let entry = FstabEntry {
            source: "/a".to_string(),
            target: "/b".to_string(),
            fs_type: "nullfs".to_string(),
            options: "ro".to_string(),
            dump: 0,
            pass: 0,
        };

        add_entry(&mw, "j1", &entry).await.unwrap();
        replace_entry(&mw, "j1", "4", &entry).await.unwrap();
        remove_entry(&mw, "j1", "4").await.unwrap();

        let calls = mw.calls.lock().unwrap();
        assert_eq!(calls[0].1[1]["action"], json!("ADD"));
        assert_eq!(calls[0].1[1]["entry"][1], json!("/b"));
        assert_eq!(calls[1].1[1]["action"], json!("REPLACE"));
        assert_eq!(calls[1].1[1]["id"], json!("4"));
        assert_eq!(calls[2].1[1], json!({"action": "REMOVE", "id": "4"}));
    }
}

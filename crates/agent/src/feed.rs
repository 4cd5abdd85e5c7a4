//! Newline-delimited JSON transaction feed

use anyhow::{Context, Result};
use gas_anomaly::{Finding, InMemoryReceipts, Receipt, TransactionEvent, TransactionHandler};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// One feed line: the transaction plus its receipt's gas used
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    #[serde(flatten)]
    pub transaction: TransactionEvent,
    pub gas_used: String,
}

/// Counters for one feed run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub processed: u64,
    pub malformed: u64,
    pub failed: u64,
    pub findings: u64,
}

/// Evaluate every record of `input`, writing findings to `output` as JSON lines
///
/// Malformed lines and transactions that fail evaluation are logged and
/// skipped.
pub async fn run<R, W>(
    input: R,
    mut output: W,
    handler: &TransactionHandler,
    receipts: &InMemoryReceipts,
) -> Result<FeedStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = FeedStats::default();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await.context("Failed to read feed")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: FeedRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                stats.malformed += 1;
                warn!(error = %e, "Skipping malformed feed line");
                continue;
            }
        };

        receipts.insert(
            record.transaction.hash.clone(),
            Receipt {
                gas_used: record.gas_used,
            },
        );

        let outcome = handler.handle(&record.transaction).await;
        // handle returns before the lookup for skipped transactions
        receipts.remove(&record.transaction.hash);

        match outcome {
            Ok(findings) => {
                stats.processed += 1;
                stats.findings += findings.len() as u64;
                write_findings(&mut output, &findings).await?;
            }
            Err(e) => {
                stats.failed += 1;
                warn!(tx_hash = %record.transaction.hash, error = %e, "Transaction evaluation failed");
            }
        }
    }

    output.flush().await.context("Failed to flush findings")?;
    debug!(?stats, "Feed exhausted");
    Ok(stats)
}

async fn write_findings<W: AsyncWrite + Unpin>(output: &mut W, findings: &[Finding]) -> Result<()> {
    for finding in findings {
        let mut line = serde_json::to_vec(finding).context("Failed to serialize finding")?;
        line.push(b'\n');
        output
            .write_all(&line)
            .await
            .context("Failed to write finding")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gas_anomaly::{Classifier, Quota, StoreConfig, WarmupGate};
    use std::sync::Arc;
    use tokio::io::BufReader;

    fn record_to(hash: &str, to: Option<&str>, gas_used: &str, gas_price: &str) -> String {
        serde_json::json!({
            "network": "1",
            "hash": hash,
            "from": "0x39f6a6c85d39d5abad8a398310c52e7c374f2ba3",
            "to": to,
            "data": "0xa9059cbb0000",
            "gasPrice": gas_price,
            "gasUsed": gas_used,
        })
        .to_string()
    }

    fn record(hash: &str, gas_used: &str, gas_price: &str) -> String {
        record_to(
            hash,
            Some("0xdac17f958d2ee523a2206206994597c13d831ec7"),
            gas_used,
            gas_price,
        )
    }

    #[tokio::test]
    async fn test_feed_emits_findings_as_json_lines() {
        let receipts = Arc::new(InMemoryReceipts::new());
        let handler = TransactionHandler::new(
            StoreConfig::default().with_warmup_gate(WarmupGate::Disabled),
            Classifier::default(),
            Arc::new(Quota::default()),
            receipts.clone(),
        );

        let input = [
            record("0x01", "0xb41d", "0x1c2c297a00"),
            "not json".to_string(),
            String::new(),
            record("0x02", "0xb41d", "0x1c2c297a00"),
            record("0x03", "0xffb41d", "0x1c2c297a00"),
        ]
        .join("\n");

        let mut output = Vec::new();
        let stats = run(BufReader::new(input.as_bytes()), &mut output, &handler, &receipts)
            .await
            .unwrap();

        assert_eq!(
            stats,
            FeedStats {
                processed: 3,
                malformed: 1,
                failed: 0,
                findings: 1,
            }
        );

        let text = String::from_utf8(output).unwrap();
        let findings: Vec<Finding> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].alert_id, "FORTA-1");
        assert!(findings[0].description.contains("0x03"));
        assert!(receipts.is_empty());
    }

    #[tokio::test]
    async fn test_skipped_transactions_leave_no_receipts() {
        let receipts = Arc::new(InMemoryReceipts::new());
        let handler = TransactionHandler::new(
            StoreConfig::default(),
            Classifier::default(),
            Arc::new(Quota::new(0)),
            receipts.clone(),
        );

        let input = [
            record("0x01", "0xb41d", "0x1c2c297a00"),
            record("0x02", "0xb41d", "0x1c2c297a00"),
            record_to("0x03", None, "0x1a2b3c", "0x1c2c297a00"),
        ]
        .join("\n");

        let mut output = Vec::new();
        let stats = run(BufReader::new(input.as_bytes()), &mut output, &handler, &receipts)
            .await
            .unwrap();

        assert_eq!(stats.processed, 3);
        assert_eq!(stats.findings, 0);
        assert!(output.is_empty());
        assert!(receipts.is_empty());
    }

    #[tokio::test]
    async fn test_contract_creation_leaves_no_receipt() {
        let receipts = Arc::new(InMemoryReceipts::new());
        let handler = TransactionHandler::new(
            StoreConfig::default(),
            Classifier::default(),
            Arc::new(Quota::default()),
            receipts.clone(),
        );

        let input = record_to("0x01", None, "0x1a2b3c", "0x1c2c297a00");
        let stats = run(BufReader::new(input.as_bytes()), Vec::new(), &handler, &receipts)
            .await
            .unwrap();

        assert_eq!(stats.processed, 1);
        assert!(receipts.is_empty());
    }
}

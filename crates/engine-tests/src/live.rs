//! Scans against a real Postgres. Run with
//! `TABLESCAN_TEST_PG_URL=... cargo test -- --ignored`.

#[cfg(test)]
mod tests {
    use crate::{pg_client, pg_url, reset_pg_table, utils::drain};
    use chrono::NaiveDate;
    use connectors::adapter::Adapter;
    use engine_core::scanner::{IncrementalScanner, ScanRequest, ScannerOptions};
    use model::{
        core::value::Value,
        offset::{OffsetToken, OffsetType},
    };
    use planner::query::ast::common::TableRef;
    use std::time::Duration;

    async fn scanner() -> IncrementalScanner {
        let adapter = Adapter::connect(&pg_url()).await.expect("connect adapter");
        IncrementalScanner::new(
            adapter.into_shared(),
            ScannerOptions {
                verify_schema: true,
                query_timeout: Some(Duration::from_secs(10)),
            },
        )
    }

    #[ignore]
    #[tokio::test]
    async fn test_live_ties_complete_group() {
        let client = pg_client().await;
        reset_pg_table(
            &client,
            "scan_ties",
            "CREATE TABLE scan_ties (seq serial PRIMARY KEY, k bigint);",
        )
        .await;
        client
            .batch_execute("INSERT INTO scan_ties (k) VALUES (5), (7), (7), (12), (20), (NULL);")
            .await
            .unwrap();

        let scanner = scanner().await;
        let request = ScanRequest::new(TableRef::new("scan_ties"), "k", OffsetType::Long, 2);
        let mut handle = scanner.start_scan(request, None).await.unwrap();

        let first = handle.poll().await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first.offset, OffsetToken::at("7"));

        let rest = drain(&mut handle).await;
        assert_eq!(rest.len(), 2);
        assert_eq!(handle.token(), &OffsetToken::at("20"));
    }

    #[ignore]
    #[tokio::test]
    async fn test_live_timestamp_epoch_offset() {
        let client = pg_client().await;
        reset_pg_table(
            &client,
            "scan_logins",
            "CREATE TABLE scan_logins (id int PRIMARY KEY, at timestamp NOT NULL);",
        )
        .await;
        client
            .batch_execute(
                "INSERT INTO scan_logins VALUES
                    (1, '2019-12-31 23:00:00'),
                    (2, '2020-01-01 00:00:00'),
                    (3, '2020-01-01 00:00:00.000250'),
                    (4, '2020-01-02 08:00:00');",
            )
            .await
            .unwrap();

        let scanner = scanner().await;
        let request = ScanRequest::new(TableRef::new("scan_logins"), "at", OffsetType::DateTime, 10);
        let mut handle = scanner.start_scan(request, Some("1577836800000")).await.unwrap();

        let rows = drain(&mut handle).await;
        let ids: Vec<Value> = rows.iter().map(|r| r.get_value("id")).collect();
        assert_eq!(ids, vec![Value::Int32(3), Value::Int32(4)]);

        let expected = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        assert_eq!(handle.token(), &OffsetToken::at(expected.to_string()));
    }

    #[ignore]
    #[tokio::test]
    async fn test_live_wide_decimal_offsets() {
        let client = pg_client().await;
        reset_pg_table(
            &client,
            "scan_ledger",
            "CREATE TABLE scan_ledger (k numeric(40, 10) PRIMARY KEY);",
        )
        .await;
        client
            .batch_execute(
                "INSERT INTO scan_ledger VALUES
                    (123456789012345678901234567890.0000000001),
                    (123456789012345678901234567890.0000000002),
                    (-1.5);",
            )
            .await
            .unwrap();

        let scanner = scanner().await;
        let request = ScanRequest::new(TableRef::new("scan_ledger"), "k", OffsetType::Decimal, 1);
        let mut handle = scanner
            .resume_scan(request, OffsetToken::at("123456789012345678901234567890.0000000001"))
            .await
            .unwrap();

        let rows = drain(&mut handle).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(
            handle.token(),
            &OffsetToken::at("123456789012345678901234567890.0000000002")
        );
    }
}

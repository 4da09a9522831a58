#[cfg(test)]
mod tests {
    use crate::{
        memory::{Fault, MemoryAdapter},
        utils::{OFFSET_COLUMN, append_row, drain, offsets, scanner, seed_table, seeded_values, seqs},
    };
    use chrono::NaiveDate;
    use connectors::sql::base::error::DbError;
    use engine_core::{
        error::ScanError,
        scanner::{IncrementalScanner, ScanRequest, ScanState, ScannerOptions},
    };
    use model::{
        core::{data_type::DataType, value::Value},
        offset::{OffsetToken, OffsetType, codec},
        pagination::cursor::TiePolicy,
    };
    use planner::query::ast::common::TableRef;
    use std::{collections::HashSet, sync::Arc, time::Duration};
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    const TIES: [i64; 5] = [5, 7, 7, 12, 20];

    fn ties_table(adapter: &MemoryAdapter) {
        let values: Vec<Value> = TIES.iter().map(|v| Value::Int(*v)).collect();
        seed_table(adapter, "events", OffsetType::Long, &values);
    }

    fn request(table: &str, offset_type: OffsetType, batch_size: usize) -> ScanRequest {
        ScanRequest::new(TableRef::new(table), OFFSET_COLUMN, offset_type, batch_size)
    }

    fn tokens(offset_type: OffsetType, values: &[Value]) -> Vec<String> {
        values
            .iter()
            .map(|v| codec::encode_value(offset_type, v).expect("encode"))
            .collect()
    }

    #[tokio::test]
    async fn test_tied_values_complete_group() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = scanner(&adapter);

        let mut handle = scanner
            .start_scan(request("events", OffsetType::Long, 2), None)
            .await
            .unwrap();

        let first = handle.poll().await.unwrap();
        assert_eq!(seqs(&first.rows), vec![0, 1, 2]);
        assert_eq!(first.offset, OffsetToken::at("7"));
        assert!(first.previous.is_start());
        assert!(!first.reached_end);

        let second = handle.poll().await.unwrap();
        assert_eq!(seqs(&second.rows), vec![3, 4]);
        assert_eq!(second.offset, OffsetToken::at("20"));
        assert!(!second.reached_end);

        let third = handle.poll().await.unwrap();
        assert!(third.is_empty());
        assert!(third.reached_end);
        assert_eq!(third.offset, OffsetToken::at("20"));

        assert_eq!(scanner.metrics().snapshot().boundary_queries, 2);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_tied_values_exclusive_skips_the_split_group() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = scanner(&adapter);

        let mut handle = scanner
            .start_scan(
                request("events", OffsetType::Long, 2).tie_policy(TiePolicy::Exclusive),
                None,
            )
            .await
            .unwrap();

        let first = handle.poll().await.unwrap();
        assert_eq!(seqs(&first.rows), vec![0, 1]);
        assert_eq!(first.offset, OffsetToken::at("7"));

        // strictly greater than 7: the second 7 (seq 2) is never delivered
        let second = handle.poll().await.unwrap();
        assert_eq!(seqs(&second.rows), vec![3, 4]);

        let third = handle.poll().await.unwrap();
        assert!(third.is_empty() && third.reached_end);
        assert_eq!(scanner.metrics().snapshot().boundary_queries, 0);
        assert!(!logs_contain("equal offset values"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_exclusive_warns_when_a_batch_ends_inside_a_group() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = scanner(&adapter);

        let mut handle = scanner
            .start_scan(
                request("events", OffsetType::Long, 3).tie_policy(TiePolicy::Exclusive),
                None,
            )
            .await
            .unwrap();

        let first = handle.poll().await.unwrap();
        assert_eq!(seqs(&first.rows), vec![0, 1, 2]);
        assert!(logs_contain("equal offset values"));
    }

    #[tokio::test]
    async fn test_empty_poll_is_idempotent() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = scanner(&adapter);
        let mut handle = scanner
            .start_scan(request("events", OffsetType::Long, 10), None)
            .await
            .unwrap();

        let all = handle.poll().await.unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.reached_end);

        for _ in 0..2 {
            let batch = handle.poll().await.unwrap();
            assert!(batch.is_empty());
            assert!(!batch.advanced());
            assert_eq!(batch.offset, OffsetToken::at("20"));
            assert_eq!(handle.token(), &OffsetToken::at("20"));
        }
        assert_eq!(handle.state(), ScanState::Idle);
        assert_eq!(scanner.metrics().snapshot().empty_polls, 2);
    }

    #[tokio::test]
    async fn test_empty_table_keeps_start_token() {
        let adapter = MemoryAdapter::new();
        seed_table(&adapter, "empty", OffsetType::DateTime, &[]);
        let scanner = scanner(&adapter);
        let mut handle = scanner
            .start_scan(request("empty", OffsetType::DateTime, 10), None)
            .await
            .unwrap();

        let batch = handle.poll().await.unwrap();
        assert!(batch.is_empty());
        assert!(batch.offset.is_start());
    }

    #[tokio::test]
    async fn test_new_rows_are_picked_up_after_the_token() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = scanner(&adapter);
        let mut handle = scanner
            .start_scan(request("events", OffsetType::Long, 10), None)
            .await
            .unwrap();
        drain(&mut handle).await;

        append_row(&adapter, "events", Value::Int(25));
        append_row(&adapter, "events", Value::Int(3)); // behind the token, never seen
        append_row(&adapter, "events", Value::Int(21));

        let batch = handle.poll().await.unwrap();
        assert_eq!(seqs(&batch.rows), vec![7, 5]);
        assert_eq!(batch.offset, OffsetToken::at("25"));
    }

    #[tokio::test]
    async fn test_resumption_is_gapless_for_every_type_and_batch_size() {
        for (i, offset_type) in OffsetType::ALL.into_iter().enumerate() {
            let adapter = MemoryAdapter::new();
            let sorted = seeded_values(offset_type, 42 + i as u64, 40);
            // insert out of order
            let mut inserted = sorted.clone();
            inserted.reverse();
            inserted.rotate_left(13);
            seed_table(&adapter, "items", offset_type, &inserted);

            let scanner = scanner(&adapter);
            let start = codec::encode(offset_type, &sorted[9]).unwrap();
            let expected = tokens(offset_type, &sorted[10..]);

            for batch_size in [1, 3, 7, 64] {
                let mut handle = scanner
                    .resume_scan(request("items", offset_type, batch_size), start.clone())
                    .await
                    .unwrap();
                let rows = drain(&mut handle).await;
                assert_eq!(
                    tokens(offset_type, &offsets(&rows)),
                    expected,
                    "{offset_type} with batch size {batch_size}"
                );
                assert_eq!(
                    handle.token(),
                    &OffsetToken::at(expected.last().unwrap().clone())
                );
            }
        }
    }

    #[tokio::test]
    async fn test_complete_group_delivers_duplicates_exactly_once() {
        let adapter = MemoryAdapter::new();
        let mut values = Vec::new();
        for (v, copies) in [(1, 3), (2, 1), (3, 4), (4, 1), (5, 2)] {
            values.extend(std::iter::repeat_n(Value::Int32(v), copies));
        }
        values.rotate_left(4);
        seed_table(&adapter, "dups", OffsetType::Integer, &values);
        let scanner = scanner(&adapter);

        for batch_size in 1..=6 {
            let mut handle = scanner
                .start_scan(request("dups", OffsetType::Integer, batch_size), None)
                .await
                .unwrap();
            let delivered = seqs(&drain(&mut handle).await);
            let unique: HashSet<i64> = delivered.iter().copied().collect();
            assert_eq!(delivered.len(), values.len(), "batch size {batch_size}");
            assert_eq!(unique.len(), values.len(), "batch size {batch_size}");
        }
    }

    #[tokio::test]
    async fn test_epoch_and_literal_initial_offsets_agree() {
        let adapter = MemoryAdapter::new();
        let at = |d: u32, h: u32, ms: u32| {
            Value::TimestampNaive(
                NaiveDate::from_ymd_opt(2020, 1, d)
                    .unwrap()
                    .and_hms_milli_opt(h, 0, 0, ms)
                    .unwrap(),
            )
        };
        let last_of_2019 = Value::TimestampNaive(
            NaiveDate::from_ymd_opt(2019, 12, 31)
                .unwrap()
                .and_hms_opt(23, 0, 0)
                .unwrap(),
        );
        seed_table(
            &adapter,
            "logins",
            OffsetType::DateTime,
            &[last_of_2019, at(1, 0, 0), at(1, 0, 500), at(2, 8, 0)],
        );
        let scanner = scanner(&adapter);

        let mut delivered = Vec::new();
        for text in ["1577836800000", "2020-01-01 00:00:00", "2020-01-01T00:00:00.000"] {
            let mut handle = scanner
                .start_scan(request("logins", OffsetType::DateTime, 10), Some(text))
                .await
                .unwrap();
            assert_eq!(handle.token(), &OffsetToken::at("1577836800000"));
            delivered.push(seqs(&drain(&mut handle).await));
        }
        assert_eq!(delivered, vec![vec![2, 3]; 3]);
    }

    #[tokio::test]
    async fn test_null_offsets_are_never_delivered() {
        let adapter = MemoryAdapter::new();
        seed_table(
            &adapter,
            "sparse",
            OffsetType::String,
            &[
                Value::String("b".into()),
                Value::Null,
                Value::String("a".into()),
                Value::String("B".into()),
            ],
        );
        let scanner = scanner(&adapter);
        let mut handle = scanner
            .start_scan(request("sparse", OffsetType::String, 10), None)
            .await
            .unwrap();

        let batch = handle.poll().await.unwrap();
        assert_eq!(seqs(&batch.rows), vec![3, 2, 0]);
        assert_eq!(batch.offset, OffsetToken::at("b"));
    }

    #[tokio::test]
    async fn test_undecodable_offset_is_not_treated_as_null() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = scanner(&adapter);
        let mut handle = scanner
            .start_scan(request("events", OffsetType::Long, 2), None)
            .await
            .unwrap();
        handle.poll().await.unwrap();
        let token = handle.token().clone();

        adapter.inject(Fault::Undecodable(OFFSET_COLUMN.into()));
        match handle.poll().await {
            Err(err @ ScanError::Schema { .. }) => {
                let message = err.to_string();
                assert!(message.contains("Cannot decode column 'k'"), "{message}");
                assert!(!message.contains("NULL"), "{message}");
                assert!(!err.is_transient());
            }
            other => panic!("unexpected poll result: {other:?}"),
        }
        assert_eq!(handle.token(), &token);
        assert_eq!(handle.state(), ScanState::Idle);

        // the same poll succeeds once the cell reads cleanly again
        let batch = handle.poll().await.unwrap();
        assert_eq!(batch.previous, token);
    }

    #[tokio::test]
    async fn test_one_scan_per_table_and_column() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = scanner(&adapter);

        let handle = scanner
            .start_scan(request("events", OffsetType::Long, 2), None)
            .await
            .unwrap();
        let err = scanner
            .resume_scan(request("EVENTS", OffsetType::Long, 2), OffsetToken::at("7"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::AlreadyScanning { .. }));

        scanner.close_scan(handle);
        assert!(scanner.registry().is_empty());
        assert!(
            scanner
                .start_scan(request("events", OffsetType::Long, 2), None)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_closed_handle_rejects_polls() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = scanner(&adapter);
        let mut handle = scanner
            .start_scan(request("events", OffsetType::Long, 2), None)
            .await
            .unwrap();

        handle.close();
        assert!(handle.is_closed());
        assert!(matches!(handle.poll().await, Err(ScanError::Closed { .. })));
        assert!(!scanner.registry().is_active(&TableRef::new("events"), OFFSET_COLUMN));
    }

    #[tokio::test]
    async fn test_configuration_errors_fail_at_start() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        adapter.create_table("flags", &[("enabled", DataType::Boolean)]);
        let scanner = scanner(&adapter);

        let err = scanner
            .resume_scan(request("events", OffsetType::Long, 2), OffsetToken::at("x7"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::MalformedOffset { .. }), "{err}");

        let err = scanner
            .start_scan(request("events", OffsetType::DateTime, 2), Some("yesterday"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidInitialOffset { .. }), "{err}");
        assert!(err.to_string().contains("yesterday"));

        let err = scanner
            .start_scan(request("events", OffsetType::Long, 0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidRequest { .. }), "{err}");

        let missing = ScanRequest::new(TableRef::new("events"), "ts", OffsetType::Long, 2);
        let err = scanner.start_scan(missing, None).await.unwrap_err();
        assert!(matches!(err, ScanError::Schema { .. }), "{err}");
        assert_eq!(err.column(), "ts");

        let flags = ScanRequest::new(TableRef::new("flags"), "enabled", OffsetType::Long, 2);
        let err = scanner.start_scan(flags, None).await.unwrap_err();
        assert!(matches!(err, ScanError::UnsupportedOffsetType { .. }), "{err}");

        let err = scanner
            .start_scan(request("events", OffsetType::DateTime, 2), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("type changed"), "{err}");

        // failed starts release their lease
        assert!(scanner.registry().is_empty());
    }

    #[tokio::test]
    async fn test_infer_offset_type_from_catalog() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        adapter.create_table("flags", &[("enabled", DataType::Boolean)]);
        let scanner = scanner(&adapter);

        assert_eq!(
            scanner
                .infer_offset_type(&TableRef::new("events"), OFFSET_COLUMN)
                .await
                .unwrap(),
            OffsetType::Long
        );
        assert!(matches!(
            scanner
                .infer_offset_type(&TableRef::new("flags"), "enabled")
                .await,
            Err(ScanError::UnsupportedOffsetType { .. })
        ));
    }

    #[tokio::test]
    async fn test_transient_failure_leaves_the_cursor() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = scanner(&adapter);
        let mut handle = scanner
            .start_scan(request("events", OffsetType::Long, 2), None)
            .await
            .unwrap();
        handle.poll().await.unwrap();

        adapter.inject(Fault::Transient);
        let err = handle.poll().await.unwrap_err();
        assert!(err.is_transient(), "{err}");
        assert_eq!(handle.token(), &OffsetToken::at("7"));
        assert_eq!(handle.state(), ScanState::Idle);

        let retried = handle.poll().await.unwrap();
        assert_eq!(seqs(&retried.rows), vec![3, 4]);
    }

    #[tokio::test]
    async fn test_failed_boundary_query_does_not_advance() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = scanner(&adapter);
        let mut handle = scanner
            .start_scan(request("events", OffsetType::Long, 2), None)
            .await
            .unwrap();

        adapter.inject(Fault::Delay(Duration::ZERO));
        adapter.inject(Fault::Transient);
        assert!(handle.poll().await.unwrap_err().is_transient());
        assert!(handle.token().is_start());

        let first = handle.poll().await.unwrap();
        assert_eq!(seqs(&first.rows), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_schema_and_fatal_failures() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = scanner(&adapter);
        let mut handle = scanner
            .start_scan(request("events", OffsetType::Long, 2), None)
            .await
            .unwrap();

        adapter.inject(Fault::Schema);
        assert!(matches!(handle.poll().await, Err(ScanError::Schema { .. })));

        adapter.inject(Fault::Fatal);
        let err = handle.poll().await.unwrap_err();
        assert!(matches!(err, ScanError::Query { .. }));
        assert!(!err.is_transient());
        assert!(handle.token().is_start());
    }

    #[tokio::test]
    async fn test_query_timeout_is_transient() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = IncrementalScanner::new(
            Arc::new(adapter.clone()),
            ScannerOptions {
                verify_schema: false,
                query_timeout: Some(Duration::from_millis(20)),
            },
        );
        let mut handle = scanner
            .start_scan(request("events", OffsetType::Long, 2), None)
            .await
            .unwrap();

        adapter.inject(Fault::Delay(Duration::from_secs(5)));
        match handle.poll().await {
            Err(ScanError::TransientQuery {
                source: DbError::Timeout(ms),
                ..
            }) => assert_eq!(ms, 20),
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert!(handle.token().is_start());
    }

    #[tokio::test]
    async fn test_dropped_poll_repeats_the_same_batch() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = scanner(&adapter);
        let mut handle = scanner
            .start_scan(request("events", OffsetType::Long, 2), None)
            .await
            .unwrap();

        adapter.inject(Fault::Delay(Duration::from_secs(5)));
        let abandoned = tokio::time::timeout(Duration::from_millis(20), handle.poll()).await;
        assert!(abandoned.is_err());
        assert_eq!(handle.state(), ScanState::Querying);

        let first = handle.poll().await.unwrap();
        assert_eq!(seqs(&first.rows), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_in_flight_query() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let cancel = CancellationToken::new();
        let scanner = scanner(&adapter).with_cancellation(cancel.clone());
        let mut handle = scanner
            .start_scan(request("events", OffsetType::Long, 2), None)
            .await
            .unwrap();

        adapter.inject(Fault::Delay(Duration::from_secs(5)));
        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let err = handle.poll().await.unwrap_err();
        assert!(matches!(err, ScanError::Cancelled { .. }), "{err}");
        assert!(handle.token().is_start());
        assert!(matches!(handle.poll().await, Err(ScanError::Cancelled { .. })));
        trigger.await.unwrap();
    }

    #[tokio::test]
    async fn test_projection_always_carries_offset_column() {
        let adapter = MemoryAdapter::new();
        ties_table(&adapter);
        let scanner = scanner(&adapter);
        let mut handle = scanner
            .start_scan(
                request("events", OffsetType::Long, 10).columns(vec!["seq".into()]),
                None,
            )
            .await
            .unwrap();

        let batch = handle.poll().await.unwrap();
        let names: Vec<&str> = batch.rows[0]
            .field_values
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["k", "seq"]);
        assert!(adapter.queries()[0].starts_with(r#"SELECT "k", "seq" FROM "events""#));
    }
}

//! Tests for reading sources
//!
//! File-based sources run against temporary data files written the same
//! way the stream writer writes them.

#[cfg(test)]
mod line_format_tests {
    use crate::error::SourceError;
    use crate::models::Reading;
    use crate::source::{format_line, parse_line};

    #[test]
    fn test_parse_line_with_trailing_comma() {
        assert_eq!(parse_line("12,3.5,").unwrap(), Reading::new(12, 3.5));
        assert_eq!(parse_line("12,3.5").unwrap(), Reading::new(12, 3.5));
        assert_eq!(parse_line(" 7 , -1e3 ,\n").unwrap(), Reading::new(7, -1000.0));
    }

    #[test]
    fn test_parse_line_accepts_integral_float_timestamp() {
        assert_eq!(parse_line("4.0,9.25,").unwrap(), Reading::new(4, 9.25));
    }

    #[test]
    fn test_parse_line_rejects_garbage() {
        for line in ["", ",", "abc,1,", "1,abc,", "1.5,2,", "-3,2,", "1,2,3,"] {
            assert!(
                matches!(parse_line(line), Err(SourceError::Malformed { .. })),
                "line {:?} should be rejected",
                line
            );
        }
    }

    #[test]
    fn test_format_line_is_parseable() {
        let reading = Reading::new(42, 10.123456789);
        let line = format_line(&reading);

        assert_eq!(line, "42,10.123456789,\n");
        assert_eq!(parse_line(&line).unwrap(), reading);
    }
}

#[cfg(test)]
mod tail_tests {
    use crate::error::SourceError;
    use crate::models::Reading;
    use crate::source::{FileTailSource, ReadingSource};
    use std::io::Write;
    use tempfile::TempDir;

    fn append(path: &std::path::Path, content: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_yields_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut source = FileTailSource::new(temp_dir.path().join("data.txt"));

        assert!(source.poll().await.unwrap().is_empty());
        assert_eq!(source.offset(), 0);
    }

    #[tokio::test]
    async fn test_resumes_from_last_offset() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.txt");
        let mut source = FileTailSource::new(&path);

        append(&path, "1,10.0,\n2,11.0,\n");
        assert_eq!(
            source.poll().await.unwrap(),
            vec![Reading::new(1, 10.0), Reading::new(2, 11.0)]
        );
        assert!(source.poll().await.unwrap().is_empty());

        append(&path, "3,12.5,\n");
        assert_eq!(source.poll().await.unwrap(), vec![Reading::new(3, 12.5)]);
        assert_eq!(source.offset(), std::fs::metadata(&path).unwrap().len());
    }

    #[tokio::test]
    async fn test_partial_line_waits_for_newline() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.txt");
        let mut source = FileTailSource::new(&path);

        append(&path, "1,10.0,\n2,1");
        assert_eq!(source.poll().await.unwrap(), vec![Reading::new(1, 10.0)]);

        append(&path, "1.0,\n");
        assert_eq!(source.poll().await.unwrap(), vec![Reading::new(2, 11.0)]);
    }

    #[tokio::test]
    async fn test_truncated_file_restarts_from_beginning() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.txt");
        let mut source = FileTailSource::new(&path);

        append(&path, "1,10.0,\n2,11.0,\n3,12.0,\n");
        assert_eq!(source.poll().await.unwrap().len(), 3);

        std::fs::write(&path, "1,20.0,\n").unwrap();
        assert_eq!(source.poll().await.unwrap(), vec![Reading::new(1, 20.0)]);
    }

    #[tokio::test]
    async fn test_malformed_line_reported_once_after_good_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.txt");
        let mut source = FileTailSource::new(&path);

        append(&path, "1,10.0,\nnot a reading\n\n2,11.0,\n");

        assert_eq!(source.poll().await.unwrap(), vec![Reading::new(1, 10.0)]);

        let err = source.poll().await.unwrap_err();
        match err {
            SourceError::Malformed { line, .. } => assert_eq!(line, "not a reading"),
            other => panic!("unexpected error: {:?}", other),
        }

        assert_eq!(source.poll().await.unwrap(), vec![Reading::new(2, 11.0)]);
    }
}

#[cfg(test)]
mod synthetic_tests {
    use crate::error::SourceError;
    use crate::source::{ReadingSource, StreamParams, SyntheticSource, SyntheticStream};

    fn quiet_params() -> StreamParams {
        StreamParams {
            noise_level: 0.0,
            anomaly_chance: 0.0,
            ..StreamParams::default()
        }
    }

    #[test]
    fn test_stream_starts_at_one_and_counts_up() {
        let stream = SyntheticStream::seeded(StreamParams::default(), 7).unwrap();
        let timestamps: Vec<u64> = stream.take(5).map(|r| r.timestamp).collect();

        assert_eq!(timestamps, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_seeded_streams_are_reproducible() {
        let first: Vec<_> = SyntheticStream::seeded(StreamParams::default(), 99)
            .unwrap()
            .take(200)
            .collect();
        let second: Vec<_> = SyntheticStream::seeded(StreamParams::default(), 99)
            .unwrap()
            .take(200)
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_quiet_stream_is_trend_plus_season() {
        let mut stream = SyntheticStream::seeded(quiet_params(), 1).unwrap();

        // Quarter period: sin = 1, baseline 10.12, amplitude max(1, 1.012)
        let t = 12;
        let params = StreamParams {
            seasonal_period: 48.0,
            trend_slope: 0.01,
            ..quiet_params()
        };
        let mut quarter = SyntheticStream::seeded(params, 1).unwrap();
        let value = quarter.generate(t);
        assert!((value - (10.12 + 1.012)).abs() < 1e-9);

        // Half period: sin = 0
        let baseline = stream.baseline(25);
        assert!((stream.generate(25) - baseline).abs() < 1e-9);
    }

    #[test]
    fn test_anomalies_shift_by_configured_level() {
        let params = StreamParams {
            noise_level: 0.0,
            anomaly_chance: 1.0,
            anomaly_level: 2.0,
            ..StreamParams::default()
        };
        let mut stream = SyntheticStream::seeded(params, 5).unwrap();

        for t in 1..100 {
            let expected = stream.baseline(t) + stream.seasonal(t);
            let shift = stream.generate(t) - expected;
            let magnitude = stream.baseline(t).max(1.0);
            assert!(
                (shift.abs() - magnitude).abs() < 1e-9,
                "unexpected shift {} at t={}",
                shift,
                t
            );
        }
    }

    #[test]
    fn test_small_anomaly_level_still_shifts_by_one() {
        let params = StreamParams {
            noise_level: 0.0,
            anomaly_chance: 1.0,
            anomaly_level: 1.0,
            ..StreamParams::default()
        };
        let mut stream = SyntheticStream::seeded(params, 3).unwrap();
        let expected = stream.baseline(10) + stream.seasonal(10);

        assert!(((stream.generate(10) - expected).abs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let cases = [
            StreamParams {
                seasonal_period: 0.0,
                ..StreamParams::default()
            },
            StreamParams {
                noise_level: -0.1,
                ..StreamParams::default()
            },
            StreamParams {
                anomaly_chance: 1.5,
                ..StreamParams::default()
            },
            StreamParams {
                base_value: f64::INFINITY,
                ..StreamParams::default()
            },
        ];

        for params in cases {
            assert!(matches!(
                SyntheticStream::new(params),
                Err(SourceError::InvalidParameters(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_synthetic_source_batches() {
        let stream = SyntheticStream::seeded(StreamParams::default(), 11).unwrap();
        let mut source = SyntheticSource::new(stream).with_batch(3);

        let first = source.poll().await.unwrap();
        let second = source.poll().await.unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(second.first().map(|r| r.timestamp), Some(4));
        assert_eq!(source.describe(), "synthetic:t=7");
    }
}

#[cfg(test)]
mod writer_tests {
    use crate::source::{parse_line, StreamParams, StreamWriter, SyntheticStream};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::broadcast;

    #[tokio::test]
    async fn test_writer_truncates_and_writes_total() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.txt");
        std::fs::write(&path, "stale,content,\n").unwrap();

        let stream = SyntheticStream::seeded(StreamParams::default(), 21).unwrap();
        let expected: Vec<_> = SyntheticStream::seeded(StreamParams::default(), 21)
            .unwrap()
            .take(5)
            .collect();

        let (_tx, rx) = broadcast::channel(1);
        let written = StreamWriter::new(&path)
            .with_interval(Duration::from_millis(1))
            .with_total_writes(5)
            .run(stream, rx)
            .await
            .unwrap();

        assert_eq!(written, 5);

        let content = std::fs::read_to_string(&path).unwrap();
        let readings: Vec<_> = content.lines().map(|l| parse_line(l).unwrap()).collect();
        assert_eq!(readings, expected);
    }

    #[tokio::test]
    async fn test_writer_stops_on_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.txt");

        let stream = SyntheticStream::seeded(StreamParams::default(), 2).unwrap();
        let (tx, rx) = broadcast::channel(1);
        tx.send(()).unwrap();

        let written = StreamWriter::new(&path)
            .with_interval(Duration::from_secs(3600))
            .run(stream, rx)
            .await
            .unwrap();

        // The first tick fires immediately, so at most one reading is written
        assert!(written <= 1);
    }
}

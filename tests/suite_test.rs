//! Suite Runner Integration Tests
//!
//! Runs the built-in suite end to end with an in-memory object store.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::path::Path;
    use tempfile::TempDir;
    use teda_check::config::EndpointsConfig;
    use teda_check::s3::{ListingResult, ObjectEntry, ObjectStore, S3Error};
    use teda_check::suite::builtin::{CATALOG_FILE, PRODUCT_FILE};
    use teda_check::suite::{builtin_suite, CaseOutcome, Runner, Tag};
    use teda_check::upload::Uploader;

    /// Stores objects in a map keyed by `bucket/key`
    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<BTreeMap<String, u64>>,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn put_file(
            &self,
            bucket: &str,
            key: &str,
            path: &Path,
        ) -> Result<Option<String>, S3Error> {
            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            self.objects.lock().insert(format!("{}/{}", bucket, key), size);
            Ok(Some("\"memory\"".to_string()))
        }

        async fn list_prefix(&self, bucket: &str, prefix: &str) -> Result<ListingResult, S3Error> {
            let full_prefix = format!("{}/{}", bucket, prefix);
            let entries = self
                .objects
                .lock()
                .iter()
                .filter(|(k, _)| k.starts_with(&full_prefix))
                .map(|(k, size)| ObjectEntry::new(&k[bucket.len() + 1..], *size))
                .collect();
            Ok(ListingResult::new(prefix, entries))
        }
    }

    fn uploader_with_exports(dir: &TempDir) -> Uploader<MemoryStore> {
        for file in [CATALOG_FILE, PRODUCT_FILE] {
            std::fs::write(dir.path().join(file), "id\n1\n").unwrap();
        }
        Uploader::new(MemoryStore::default(), "teda-ingest", dir.path())
    }

    #[tokio::test]
    async fn test_builtin_suite_passes() {
        let dir = TempDir::new().unwrap();
        let suite = builtin_suite(&EndpointsConfig::default()).unwrap();

        let report = Runner::new(uploader_with_exports(&dir))
            .run(&suite, &[])
            .await
            .unwrap();

        assert_eq!(report.results().len(), 10);
        assert!(report.is_success(), "{}", report);
        assert_eq!(report.passed(), 10);
    }

    #[tokio::test]
    async fn test_missing_export_fails_upload_case() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CATALOG_FILE), "id\n1\n").unwrap();
        let uploader = Uploader::new(MemoryStore::default(), "teda-ingest", dir.path());

        let suite = builtin_suite(&EndpointsConfig::default()).unwrap();
        let report = Runner::new(uploader)
            .run(&suite, &[Tag::Uploader])
            .await
            .unwrap();

        assert_eq!(report.results().len(), 2);
        assert_eq!(
            report.outcome("s3_uploader[catalog_data.csv]"),
            Some(&CaseOutcome::Passed)
        );
        assert!(matches!(
            report.outcome("s3_uploader[products_sales.csv]"),
            Some(CaseOutcome::Failed(reason)) if reason.contains("products_sales.csv")
        ));
    }

    #[tokio::test]
    async fn test_tag_selection() {
        let suite = builtin_suite(&EndpointsConfig::default()).unwrap();
        let runner: Runner<MemoryStore> = Runner::without_storage("no credentials");

        let report = runner.run(&suite, &[Tag::Common]).await.unwrap();
        let names: Vec<&str> = report.results().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "fetch_catalog_products_timeout[catalog]",
                "fetch_catalog_products_timeout[product]",
            ]
        );
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_product_without_catalog_complete_is_skipped() {
        let suite = builtin_suite(&EndpointsConfig::default()).unwrap();
        let runner: Runner<MemoryStore> = Runner::without_storage("no credentials");

        // The dependency is not selected, so it never passes.
        let report = runner.run(&suite, &[Tag::Product]).await.unwrap();
        assert_eq!(report.results().len(), 1);
        assert!(matches!(
            report.outcome("fetch_product_complete"),
            Some(CaseOutcome::Skipped(reason)) if reason.contains("fetch_catalog_complete")
        ));
    }

    #[tokio::test]
    async fn test_uploads_fail_without_storage() {
        let suite = builtin_suite(&EndpointsConfig::default()).unwrap();
        let runner: Runner<MemoryStore> =
            Runner::without_storage("AWS_ACCESS_KEY_ID not set");

        let report = runner.run(&suite, &[]).await.unwrap();
        assert_eq!(report.failed(), 2);
        assert_eq!(report.passed(), 8);
        assert_eq!(report.skipped(), 0);
        assert!(!report.is_success());
        assert!(matches!(
            report.outcome("s3_uploader[catalog_data.csv]"),
            Some(CaseOutcome::Failed(reason)) if reason.contains("AWS_ACCESS_KEY_ID not set")
        ));
    }
}

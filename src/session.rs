//! Caller-owned application context: registry, settings and their store.
//!
//! A [`Session`] is what a front end (the CLI, a GUI) holds between user
//! actions. Edits go to the in-memory [`Config`]; [`Session::save`] persists
//! them. [`Session::generate_report`] additionally saves the configuration
//! after every successful generation, so the last-used settings survive a
//! restart.
//!
//! Auto-save is a separate outcome. A failed save never turns a generated
//! report into an error; it is reported next to the report in
//! [`ReportDelivery::autosave`].

use crate::config::{Config, LlmSettings};
use crate::error::ReportError;
use crate::registry::DocumentTypeRegistry;
use crate::report::{Report, ReportPipeline, ReportRequest};
use crate::store::ConfigStore;
use tracing::warn;

/// A generated report plus the result of the automatic save that followed it.
#[derive(Debug)]
pub struct ReportDelivery {
    pub report: Report,
    pub autosave: Result<(), ReportError>,
}

/// In-memory configuration bound to its store.
pub struct Session {
    store: ConfigStore,
    config: Config,
    pipeline: ReportPipeline,
}

impl Session {
    /// Load `store` (defaults on first run or a corrupt file) and build the
    /// default pipeline.
    pub fn open(store: ConfigStore) -> Result<Self, ReportError> {
        Ok(Self::with_pipeline(store, ReportPipeline::new()?))
    }

    /// Like [`Session::open`] with a caller-supplied pipeline.
    pub fn with_pipeline(store: ConfigStore, pipeline: ReportPipeline) -> Self {
        let config = store.load();
        Self {
            store,
            config,
            pipeline,
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &DocumentTypeRegistry {
        &self.config.doc_types
    }

    pub fn registry_mut(&mut self) -> &mut DocumentTypeRegistry {
        &mut self.config.doc_types
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.config.settings
    }

    pub fn settings_mut(&mut self) -> &mut LlmSettings {
        &mut self.config.settings
    }

    pub fn pipeline(&self) -> &ReportPipeline {
        &self.pipeline
    }

    /// Persist the current configuration.
    pub fn save(&self) -> Result<(), ReportError> {
        self.store.save(&self.config)
    }

    /// Generate a report with the current settings, then auto-save.
    ///
    /// Returns `Err` only when generation fails; the configuration is not
    /// written in that case.
    pub async fn generate_report(
        &self,
        doc_type: &str,
        pdf_bytes: Option<Vec<u8>>,
        instructions: &str,
    ) -> Result<ReportDelivery, ReportError> {
        let request = ReportRequest {
            doc_type: doc_type.to_string(),
            pdf_bytes,
            instructions: instructions.to_string(),
            settings: self.config.settings.clone(),
        };
        let report = self.pipeline.run(&self.config.doc_types, request).await?;

        let autosave = self.save();
        if let Err(e) = &autosave {
            warn!("Report generated but configuration not saved: {}", e);
        }
        Ok(ReportDelivery { report, autosave })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::TextExtractor;
    use std::sync::Arc;

    struct FixedText(&'static str);

    impl TextExtractor for FixedText {
        fn extract(&self, _pdf_bytes: &[u8]) -> Result<String, ReportError> {
            Ok(self.0.to_string())
        }
    }

    fn session_at(store: ConfigStore, text: &'static str) -> Session {
        let pipeline = ReportPipeline::with_extractor(Arc::new(FixedText(text))).unwrap();
        Session::with_pipeline(store, pipeline)
    }

    async fn mock_server(body: &str) -> (mockito::ServerGuard, mockito::Mock) {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        (server, mock)
    }

    #[test]
    fn edits_persist_only_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("cr_config.json"));
        let mut session = session_at(store.clone(), "x");

        session.registry_mut().add("IRM cardiaque", "").unwrap();
        session.settings_mut().set_max_tokens(2048);
        assert_eq!(store.load(), Config::default());

        session.save().unwrap();
        let reloaded = store.load();
        assert!(reloaded.doc_types.contains("IRM cardiaque"));
        assert_eq!(reloaded.settings.max_tokens, 2048);
    }

    #[tokio::test]
    async fn success_autosaves_settings() {
        let (server, mock) =
            mock_server(r#"{"choices":[{"message":{"content":"Conclusion: ECG normal."}}]}"#).await;
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("cr_config.json"));
        let mut session = session_at(store.clone(), "Rythme sinusal régulier, FC 72/min.");
        session.settings_mut().base_url = server.url();

        let delivery = session
            .generate_report("ECG standard", Some(b"%PDF".to_vec()), "")
            .await
            .unwrap();

        assert_eq!(delivery.report.text, "Conclusion: ECG normal.");
        assert!(delivery.autosave.is_ok());
        assert_eq!(store.load().settings.base_url, server.url());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failed_generation_does_not_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cr_config.json");
        let session = session_at(ConfigStore::new(&path), "texte");

        let err = session
            .generate_report("ECG standard", None, "")
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::MissingInput));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn autosave_failure_keeps_the_report() {
        let (server, _mock) =
            mock_server(r#"{"choices":[{"message":{"content":"Compte-rendu"}}]}"#).await;
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be replaced by a file: every save fails.
        let mut session = session_at(ConfigStore::new(dir.path()), "texte");
        session.settings_mut().base_url = server.url();

        let delivery = session
            .generate_report("Holter ECG", Some(b"%PDF".to_vec()), "")
            .await
            .unwrap();

        assert_eq!(delivery.report.text, "Compte-rendu");
        assert!(matches!(
            delivery.autosave,
            Err(ReportError::Persistence { .. })
        ));
    }
}

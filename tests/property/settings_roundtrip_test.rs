//! Property-based tests for ClientSettings serialization round-trip.
//!
//! These tests verify that ClientSettings can be serialized to JSON and
//! deserialized back without data loss, both directly and through the
//! settings file's save/load cycle.

use proptest::prelude::*;
use realtime_bookmarks::services::settings_file::SettingsFile;
use realtime_bookmarks::types::settings::{
    ClientSettings, LoggingSettings, SessionSettings, StoreBackend, StoreSettings,
};
use tempfile::TempDir;

// --- Arbitrary strategies for all settings sub-types ---

fn arb_backend() -> impl Strategy<Value = StoreBackend> {
    prop_oneof![Just(StoreBackend::Sqlite), Just(StoreBackend::Rest)]
}

fn arb_store_settings() -> impl Strategy<Value = StoreSettings> {
    (
        arb_backend(),
        proptest::option::of("/[a-z]{1,10}/[a-z]{1,10}\\.db"),
        "https?://[a-z]{3,12}\\.[a-z]{2,4}",
        "[A-Za-z0-9._-]{0,40}",
        "[a-z_]{1,16}",
    )
        .prop_map(|(backend, database_path, base_url, api_key, table)| StoreSettings {
            backend,
            database_path,
            base_url,
            api_key,
            table,
        })
}

fn arb_logging_settings() -> impl Strategy<Value = LoggingSettings> {
    (
        prop_oneof![Just("error"), Just("warn"), Just("info"), Just("debug"), Just("trace")],
        any::<bool>(),
    )
        .prop_map(|(level, json)| LoggingSettings {
            level: level.to_string(),
            json,
        })
}

fn arb_client_settings() -> impl Strategy<Value = ClientSettings> {
    (arb_store_settings(), any::<bool>(), arb_logging_settings()).prop_map(
        |(store, refresh_on_visibility, logging)| ClientSettings {
            store,
            session: SessionSettings { refresh_on_visibility },
            logging,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn settings_serialization_roundtrip(settings in arb_client_settings()) {
        let json = serde_json::to_string(&settings)
            .expect("Serialization to JSON should succeed for any valid ClientSettings");

        let deserialized: ClientSettings = serde_json::from_str(&json)
            .expect("Deserialization from JSON should succeed for valid JSON");

        prop_assert_eq!(
            deserialized,
            settings,
            "Deserialized ClientSettings must equal the original"
        );
    }

    #[test]
    fn settings_file_save_load_roundtrip(settings in arb_client_settings()) {
        let dir = TempDir::new().unwrap();
        let file = SettingsFile::new(dir.path().join("settings.json"));

        file.save(&settings).unwrap();
        prop_assert_eq!(file.load().unwrap(), settings.clone());
        prop_assert_eq!(file.load_or_create().unwrap(), settings);
    }
}

//! End-to-end profile editing against a YAML backend and SQLite index

use std::sync::Arc;

use metadisplay_profiles::{
    AssociationIndex, ErrorSeverity, IndexError, IndexRow, MemoryConfigBackend, MetadataDisplay,
    MetadataDisplaySettings, PartialFieldRule, PartialTruncationRule, ProfileEdit, ProfilesError,
    Severity, SqliteAssociationIndex, StaticContentModelCatalog, StaticFieldCatalog,
    ValidationError, ValidationKind, YamlConfigBackend,
};
use tempfile::TempDir;

fn field_catalog() -> Arc<StaticFieldCatalog> {
    Arc::new(
        StaticFieldCatalog::new()
            .field("dc.title")
            .field("dc.creator")
            .field("dc.subject")
            .field("dc.description")
            .date_field("mods_originInfo_dateIssued_dt"),
    )
}

fn cmodel_catalog() -> Arc<StaticContentModelCatalog> {
    Arc::new(
        StaticContentModelCatalog::new()
            .model("cmodelX", "Model X")
            .model("cmodelY", "Model Y")
            .model("cmodelZ", "Model Z"),
    )
}

async fn open_service(tmp: &TempDir) -> (MetadataDisplay, Arc<SqliteAssociationIndex>) {
    let index = Arc::new(
        SqliteAssociationIndex::open(tmp.path().join("index.db")).expect("Failed to open index"),
    );
    let service = MetadataDisplay::from_parts(
        Arc::new(YamlConfigBackend::new(tmp.path().join("configs.yaml"))),
        index.clone(),
        field_catalog(),
        cmodel_catalog(),
        MetadataDisplaySettings::default(),
    )
    .await
    .expect("Failed to open service");
    (service, index)
}

fn with_cmodels(cmodels: &[&str]) -> ProfileEdit {
    ProfileEdit {
        cmodels: cmodels.iter().map(|c| c.to_string()).collect(),
        ..Default::default()
    }
}

#[test_log::test(tokio::test)]
async fn index_is_rebuilt_from_current_profiles() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let (service, index) = open_service(&tmp).await;

    for (name, cmodels) in [
        ("p0", &["cmodelZ"][..]),
        ("p1", &["cmodelX"][..]),
        ("p2", &["cmodelX", "cmodelY"][..]),
    ] {
        service.create_profile(name, name).await.unwrap();
        service
            .save_field_edits(name, with_cmodels(cmodels))
            .await
            .unwrap();
    }
    assert!(index.rows().unwrap().contains(&IndexRow::new("p0", "cmodelZ")));

    service.delete_profile("p0").await.unwrap();

    assert_eq!(
        index.rows().unwrap(),
        [
            IndexRow::new("p1", "cmodelX"),
            IndexRow::new("p2", "cmodelX"),
            IndexRow::new("p2", "cmodelY"),
        ]
    );
    assert_eq!(
        service.profiles_for_content_model("cmodelX").await.unwrap(),
        ["p1", "p2"]
    );
}

#[test_log::test(tokio::test)]
async fn one_unknown_field_persists_nothing() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let (service, _) = open_service(&tmp).await;
    service.create_profile("default", "Default").await.unwrap();
    let before = std::fs::read_to_string(tmp.path().join("configs.yaml")).unwrap();

    let mut edit = ProfileEdit::default();
    for name in ["dc.title", "dc.creator", "not_in_solr", "dc.subject"] {
        edit.fields.insert(name.into(), PartialFieldRule::default());
    }
    let err = service.save_field_edits("default", edit).await.unwrap_err();

    let validation = err.as_validation().expect("expected a validation error");
    assert_eq!(validation.kind(), ValidationKind::UnknownField);
    assert_eq!(validation.identifiers(), ["not_in_solr"]);
    assert_eq!(err.severity(), ErrorSeverity::Error);

    assert!(service.get_fields("default").await.unwrap().is_empty());
    let after = std::fs::read_to_string(tmp.path().join("configs.yaml")).unwrap();
    assert_eq!(before, after);
}

#[test_log::test(tokio::test)]
async fn hyperlink_and_truncation_leave_store_unchanged() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let (service, _) = open_service(&tmp).await;
    service.create_profile("default", "Default").await.unwrap();

    let mut edit = ProfileEdit::default();
    edit.fields.insert(
        "dc.title".into(),
        PartialFieldRule {
            hyperlink: Some(true),
            truncation: Some(PartialTruncationRule {
                max_length: Some(5),
                ..Default::default()
            }),
            ..Default::default()
        },
    );
    let err = service.save_field_edits("default", edit).await.unwrap_err();

    assert!(matches!(
        err,
        ProfilesError::Validation(ValidationError::MutuallyExclusiveOptions { ref fields })
            if fields == &["dc.title".to_string()]
    ));
    assert!(service.get_fields("default").await.unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn working_set_round_trip_with_diff() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let (service, _) = open_service(&tmp).await;
    let fields = field_catalog();
    service.create_profile("default", "Default").await.unwrap();

    let mut set = service.working_set("default").await.unwrap();
    set.add_field("dc.title", fields.as_ref()).unwrap();
    set.add_field("dc.creator", fields.as_ref()).unwrap();
    service
        .save_field_edits("default", set.into_edit())
        .await
        .unwrap();

    // Pending rows are saved with their sort-last weight
    let stored = service.get_fields("default").await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|(_, rule)| rule.weight == 10_000));

    let mut set = service.working_set("default").await.unwrap();
    assert_eq!(
        set.remove_selected_fields(&[]),
        Err(ValidationError::NoSelection)
    );
    set.remove_selected_fields(&["dc.title".into()]).unwrap();
    set.add_field("dc.subject", fields.as_ref()).unwrap();
    let committed = service
        .save_field_edits("default", set.into_edit())
        .await
        .unwrap();

    assert_eq!(committed.value.fields.to_insert, ["dc.subject"]);
    assert_eq!(committed.value.fields.to_update, ["dc.creator"]);
    assert_eq!(committed.value.fields.to_delete, ["dc.title"]);

    let names: Vec<_> = service
        .get_fields("default")
        .await
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, ["dc.creator", "dc.subject"]);
}

#[test_log::test(tokio::test)]
async fn profiles_survive_reopen() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    {
        let (service, _) = open_service(&tmp).await;
        service.create_profile("default", "Default").await.unwrap();
        let mut edit = with_cmodels(&["cmodelY"]);
        edit.fields.insert(
            "mods_originInfo_dateIssued_dt".into(),
            PartialFieldRule {
                date_format: Some("Y-m-d".into()),
                ..Default::default()
            },
        );
        edit.description.field = "dc.description".into();
        edit.description.label = "Abstract".into();
        service.save_field_edits("default", edit).await.unwrap();
    }

    let yaml = std::fs::read_to_string(tmp.path().join("configs.yaml")).unwrap();
    assert!(yaml.contains("mods_originInfo_dateIssued_dt"));

    let (service, _) = open_service(&tmp).await;
    let profile = service.get_profile("default").await.unwrap();
    assert_eq!(profile.label, "Default");
    assert_eq!(profile.description.label, "Abstract");
    let rule = service
        .get_field("mods_originInfo_dateIssued_dt", "default")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rule.date_format, "Y-m-d");
    assert_eq!(
        service.profiles_for_content_model("cmodelY").await.unwrap(),
        ["default"]
    );
}

/// Fails every rebuild until told otherwise.
#[derive(Default)]
struct FlakyIndex {
    inner: Option<SqliteAssociationIndex>,
    broken: std::sync::atomic::AtomicBool,
}

impl AssociationIndex for FlakyIndex {
    fn rebuild(&self, rows: &[IndexRow]) -> Result<(), IndexError> {
        if self.broken.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(IndexError::Poisoned);
        }
        match &self.inner {
            Some(index) => index.rebuild(rows),
            None => Ok(()),
        }
    }

    fn rows(&self) -> Result<Vec<IndexRow>, IndexError> {
        match &self.inner {
            Some(index) => index.rows(),
            None => Ok(Vec::new()),
        }
    }

    fn profiles_for_content_model(&self, content_model: &str) -> Result<Vec<String>, IndexError> {
        match &self.inner {
            Some(index) => index.profiles_for_content_model(content_model),
            None => Ok(Vec::new()),
        }
    }
}

#[test_log::test(tokio::test)]
async fn index_failure_is_a_warning_and_resync_repairs() {
    let index = Arc::new(FlakyIndex {
        inner: Some(SqliteAssociationIndex::open_in_memory().unwrap()),
        ..Default::default()
    });
    let backend = Arc::new(MemoryConfigBackend::new());
    let service = MetadataDisplay::from_parts(
        backend.clone(),
        index.clone(),
        field_catalog(),
        cmodel_catalog(),
        MetadataDisplaySettings::default(),
    )
    .await
    .unwrap();
    service.create_profile("default", "Default").await.unwrap();

    index.broken.store(true, std::sync::atomic::Ordering::SeqCst);
    let committed = service
        .save_field_edits("default", with_cmodels(&["cmodelX"]))
        .await
        .expect("config save must succeed despite the index");

    assert_eq!(committed.warnings.len(), 1);
    assert_eq!(committed.warnings[0].severity(), ErrorSeverity::Warning);
    assert!(backend
        .stored()
        .await
        .get("default")
        .unwrap()
        .cmodel_associations
        .contains("cmodelX"));
    assert!(index.rows().unwrap().is_empty());
    assert!(service.resync().await.is_err());

    index.broken.store(false, std::sync::atomic::Ordering::SeqCst);
    service.resync().await.unwrap();
    assert_eq!(index.rows().unwrap(), [IndexRow::new("default", "cmodelX")]);
}

// ABOUTME: Integration tests for the shipped upgrade template and stack generation.
// ABOUTME: Renders the real asset and stores stacks on disk through the filesystem store.

mod support;

use portainer_upgrade::clock::FixedClock;
use portainer_upgrade::storage::FsFileStore;
use portainer_upgrade::types::{EnvironmentType, ImageRef};
use portainer_upgrade::upgrade::{
    ArtifactGenerator, STACK_CATEGORY, UpgradeParameters, UpgradeTemplate, stack_file_name,
    stack_name,
};
use proptest::prelude::*;
use std::sync::Arc;
use support::{assets_path, updater_arg, updater_command};

fn parameters(env_type: EnvironmentType, skip_pull_image: bool) -> UpgradeParameters {
    UpgradeParameters {
        image: ImageRef::parse("portainer/portainer-ee:2.19.0").unwrap(),
        skip_pull_image,
        updater_image: ImageRef::parse("portainer/portainer-updater:latest").unwrap(),
        license: "3-abc/def+ghi==".to_string(),
        env_type,
        version: "2.19.0".to_string(),
    }
}

async fn shipped_template() -> UpgradeTemplate {
    let generator = ArtifactGenerator::new(assets_path(), Arc::new(FsFileStore::new("/unused")));
    UpgradeTemplate::load(&generator.template_path())
        .await
        .unwrap()
}

#[tokio::test]
async fn shipped_template_uses_every_parameter() {
    let template = shipped_template().await;
    let fields = parameters(EnvironmentType::Standalone, false)
        .field_names()
        .unwrap();
    assert_eq!(template.placeholders(), &fields);
}

#[tokio::test]
async fn rendered_stack_is_a_compose_document() {
    let template = shipped_template().await;
    let rendered = template
        .render(&parameters(EnvironmentType::Swarm, true))
        .unwrap();

    let doc: serde_yaml::Value = serde_yaml::from_str(&rendered).unwrap();
    let updater = &doc["services"]["updater"];
    assert_eq!(
        updater["image"].as_str(),
        Some("portainer/portainer-updater:latest")
    );

    let command: Vec<&str> = updater["command"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(
        command,
        vec![
            "portainer",
            "--image",
            "portainer/portainer-ee:2.19.0",
            "--env-type",
            "swarm",
            "--license",
            "3-abc/def+ghi==",
            "--skip-pull-image",
        ]
    );
    assert_eq!(
        updater["labels"]["io.portainer.upgrade.version"].as_str(),
        Some("2.19.0")
    );
}

#[tokio::test]
async fn skip_pull_flag_is_omitted_when_pulling() {
    let template = shipped_template().await;
    let rendered = template
        .render(&parameters(EnvironmentType::Standalone, false))
        .unwrap();

    assert_eq!(updater_command(&rendered).len(), 7);
    assert!(!rendered.contains("--skip-pull-image"));
}

#[tokio::test]
async fn license_cannot_break_out_of_its_argument() {
    let template = shipped_template().await;
    let licenses = [
        "a\"b",
        "k\"\n    privileged: true\n    x: \"y",
        "key: value\n- --privileged",
        "{{{image}}} #comment",
        "tab\there\\back\u{2028}line\u{85}nel",
    ];

    for license in licenses {
        let mut params = parameters(EnvironmentType::Standalone, false);
        params.license = license.to_string();
        let rendered = template.render(&params).unwrap();

        assert_eq!(
            updater_arg(&rendered, "--license").as_deref(),
            Some(license),
            "license {license:?} was altered"
        );
        assert_eq!(updater_command(&rendered).len(), 7);

        let doc: serde_yaml::Value = serde_yaml::from_str(&rendered).unwrap();
        let keys: Vec<&str> = doc["services"]["updater"]
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["image", "command", "labels", "volumes", "restart"]);
    }
}

#[tokio::test]
async fn rendering_is_deterministic() {
    let template = shipped_template().await;
    let params = parameters(EnvironmentType::Standalone, false);
    assert_eq!(
        template.render(&params).unwrap(),
        template.render(&params).unwrap()
    );
}

#[tokio::test]
async fn generated_stacks_land_on_disk_with_increasing_names() {
    let data = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::from_unix(1_700_000_000));
    let generator = ArtifactGenerator::new(
        assets_path(),
        Arc::new(FsFileStore::new(data.path())),
    )
    .with_clock(clock.clone());
    let params = parameters(EnvironmentType::Standalone, false);

    let first = generator.generate(&params).await.unwrap();
    clock.advance(chrono::Duration::seconds(5));
    let second = generator.generate(&params).await.unwrap();

    assert_eq!(
        first.project_path,
        data.path().join("compose").join(STACK_CATEGORY)
    );
    assert_eq!(first.entry_point, "upgrade-1700000000.yml");
    assert_eq!(second.entry_point, "upgrade-1700000005.yml");
    assert!(first.name < second.name);

    let on_disk = std::fs::read_to_string(first.file_path()).unwrap();
    assert_eq!(on_disk, generator.render(&params).await.unwrap());

    generator.discard(&first).await;
    assert!(!first.file_path().exists());
    assert!(second.file_path().exists());
}

proptest! {
    #[test]
    fn stack_names_never_contain_dots(
        timestamp in 0i64..4_000_000_000,
        major in 0u32..100,
        minor in 0u32..100,
        patch in 0u32..100,
    ) {
        let version = format!("{major}.{minor}.{patch}");
        let name = stack_name(timestamp, &version);
        prop_assert!(!name.contains('.'));
        prop_assert_eq!(name, format!("portainer-upgrade-{timestamp}-{major}-{minor}-{patch}"));
        prop_assert_eq!(stack_file_name(timestamp), format!("upgrade-{timestamp}.yml"));
    }
}

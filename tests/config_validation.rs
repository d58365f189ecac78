use murmuration_lib::model::config::{
    FlockConfig, GlobalSetting, SectionSetting, SettingValue,
};
use murmuration_lib::model::state::{Dimensions, RuleKind};

#[test]
fn test_reference_defaults() {
    let config = FlockConfig::default();
    assert_eq!(config.world.size, 4.0);
    assert_eq!(config.world.count, 4000);
    assert_eq!(config.world.particle_size, 0.08);
    assert_eq!(config.grid.divisions, 16);
    assert_eq!(config.global.speed, 0.3);
    assert!((config.perception_radius() - 0.24).abs() < 1e-12);
    assert!((config.boundary() - 1.96).abs() < 1e-12);
    assert_eq!(config.effective_sensitivity(RuleKind::Obstacles), 2.0);
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let config = FlockConfig::from_toml(
        r#"
        [world]
        count = 500
        dimensions = "2d"

        [separation]
        sensitivity = 0.01
        "#,
    )
    .expect("Partial config should parse");

    assert_eq!(config.world.count, 500);
    assert_eq!(config.world.dimensions, Dimensions::Two);
    assert_eq!(config.separation.sensitivity, 0.01);
    assert!(config.separation.enabled);
    assert_eq!(config.alignment, FlockConfig::default().alignment);
}

#[test]
fn test_toml_round_trip() {
    let mut config = FlockConfig::default();
    config.world.seed = Some(99);
    config.cohesion.enabled = false;
    let text = config.to_toml().unwrap();
    assert_eq!(FlockConfig::from_toml(&text).unwrap(), config);
}

#[test]
fn test_invalid_values_rejected() {
    let cases: Vec<(&str, Box<dyn Fn(&mut FlockConfig)>)> = vec![
        ("size", Box::new(|c| c.world.size = 0.0)),
        ("count", Box::new(|c| c.world.count = 0)),
        ("divisions", Box::new(|c| c.grid.divisions = 0)),
        ("attentiveness", Box::new(|c| c.global.attentiveness = 1.5)),
        ("speed", Box::new(|c| c.global.speed = f64::NAN)),
        ("sensitivity", Box::new(|c| c.alignment.sensitivity = -0.1)),
        ("log interval", Box::new(|c| c.log_interval = 0)),
    ];
    for (name, mutate) in cases {
        let mut config = FlockConfig::default();
        mutate(&mut config);
        assert!(config.validate().is_err(), "{} should be rejected", name);
    }
}

#[test]
fn test_rejected_setting_leaves_config_untouched() {
    let mut config = FlockConfig::default();
    let before = config.clone();

    assert!(config
        .set_global(GlobalSetting::Attentiveness, SettingValue::Number(2.0))
        .is_err());
    assert!(config
        .set_global(GlobalSetting::Speed, SettingValue::Flag(true))
        .is_err());
    assert!(config
        .set_global(GlobalSetting::Count, SettingValue::Number(12.5))
        .is_err());
    assert!(config
        .set_section(RuleKind::Cohesion, SectionSetting::Enabled, SettingValue::Number(1.0))
        .is_err());

    assert_eq!(config, before);
}

#[test]
fn test_setting_events_describe_the_change() {
    let mut config = FlockConfig::default();

    let event = config
        .set_section(
            RuleKind::Alignment,
            SectionSetting::Sensitivity,
            SettingValue::Number(0.5),
        )
        .unwrap();
    assert_eq!(event.section, Some(RuleKind::Alignment));
    assert_eq!(event.value, SettingValue::Number(0.5));
    assert_eq!(
        config.section(RuleKind::Alignment, SectionSetting::Sensitivity),
        SettingValue::Number(0.5)
    );

    let event = config
        .set_global(GlobalSetting::Is3D, SettingValue::Flag(false))
        .unwrap();
    assert_eq!(event.section, None);
    assert_eq!(config.world.dimensions, Dimensions::Two);
    assert_eq!(config.global(GlobalSetting::Is3D), SettingValue::Flag(false));
}

#[test]
fn test_fingerprint_ignores_tunables() {
    let base = FlockConfig::default();

    let mut tuned = base.clone();
    tuned.global.speed = 0.9;
    tuned.alignment.sensitivity = 0.1;
    assert_eq!(base.fingerprint(), tuned.fingerprint());

    let mut resized = base.clone();
    resized.world.size = 8.0;
    assert_ne!(base.fingerprint(), resized.fingerprint());
}

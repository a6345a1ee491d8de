//! Loading injector configuration and building injectors from it

use std::rc::Rc;

use arbor_config::{ConfigLoader, ManualArgumentPolicy};
use arbor_di::*;
use once_cell::sync::Lazy;
use serial_test::serial;

static SOURCE: Lazy<Identifier<String>> = Lazy::new(|| Identifier::new("source"));

struct Report {
    title: Option<Rc<String>>,
    source: Rc<String>,
}

impl Injectable for Report {
    const ARITY: usize = 2;

    fn annotations() -> Vec<ParamAnnotation> {
        vec![ParamAnnotation::inject(1, &*SOURCE)]
    }

    fn construct(args: &Arguments) -> DiResult<Self> {
        Ok(Report {
            title: args.optional(0)?,
            source: args.get(1)?,
        })
    }
}

#[test]
#[serial]
fn toml_settings_reach_the_resolver() {
    let config = ConfigLoader::new()
        .with_env_prefix("ARBOR_SCENARIO_TOML")
        .with_toml("[resolution]\nmax_depth = 2\n")
        .load()
        .unwrap();
    let ids: Vec<Identifier<u32>> = (0..4).map(|i| Identifier::new(format!("step{i}"))).collect();

    let mut builder = Injector::builder()
        .config(config)
        .bind(Declaration::value(&ids[0], Rc::new(0)));
    for pair in ids.windows(2) {
        builder = builder.bind(
            Declaration::factory(&pair[1], |args| Ok(Rc::new(*args.get::<u32>(0)? + 1)))
                .with_deps(deps![pair[0]]),
        );
    }
    let injector = builder.build().unwrap();

    assert!(matches!(
        injector.get(&ids[3]),
        Err(DiError::ResolutionTooDeep { limit: 2, .. })
    ));
    assert_eq!(*injector.get(&ids[1]).unwrap(), 1);
    assert_eq!(*injector.get(&ids[3]).unwrap(), 3);
}

#[test]
#[serial]
fn environment_selects_strict_manual_arguments() {
    std::env::set_var("ARBOR_SCENARIO_ENV_RESOLUTION__MANUAL_ARGUMENTS", "reject");
    let loaded = ConfigLoader::new()
        .with_env_prefix("ARBOR_SCENARIO_ENV")
        .load();
    std::env::remove_var("ARBOR_SCENARIO_ENV_RESOLUTION__MANUAL_ARGUMENTS");

    let config = loaded.unwrap();
    assert_eq!(config.resolution.manual_arguments, ManualArgumentPolicy::Reject);

    let root = Injector::builder()
        .config(config)
        .bind(Declaration::value(&*SOURCE, Rc::new("ledger".to_string())))
        .build()
        .unwrap();
    let child = root.create_child([]).unwrap();

    let err = child.create_instance::<Report>(Vec::new()).err();
    assert!(matches!(err, Some(DiError::ArgumentUnavailable { index: 0, .. })));

    let report = child
        .create_instance::<Report>(vec![Instance::new(Rc::new("Q3".to_string()))])
        .unwrap();
    assert_eq!(report.title.as_deref().map(String::as_str), Some("Q3"));
    assert_eq!(report.source.as_str(), "ledger");
}

#[test]
#[serial]
fn rendered_config_round_trips_through_the_loader() {
    let mut config = arbor_config::InjectorConfig::default();
    config.resolution.max_depth = 9;
    config.diagnostics.log_shadowing = false;

    let rendered = config.to_toml_string().unwrap();
    let reloaded = ConfigLoader::new()
        .with_env_prefix("ARBOR_SCENARIO_ROUND_TRIP")
        .with_toml(rendered)
        .load()
        .unwrap();

    let injector = Injector::builder().config(reloaded).build().unwrap();
    assert_eq!(injector.config().resolution.max_depth, 9);
    assert!(!injector.config().diagnostics.log_shadowing);

    let snapshot: serde_json::Value = serde_json::from_str(&injector.snapshot().to_json().unwrap()).unwrap();
    assert_eq!(snapshot["depth"], 0);
    assert_eq!(snapshot["bindings"], serde_json::json!([]));
}

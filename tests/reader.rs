//! End-to-end reading scenarios: versioned documents, includes, parser
//! configuration.

use std::sync::Arc;

use sdformat::{EnforcementPolicy, ErrorCode, ParserConfig, Root, SDF_VERSION};

#[test]
fn minimal_world_loads_clean() {
    let mut root = Root::new();
    let errors = root.load_string(
        r#"<sdf version="1.9"><world name="w"/></sdf>"#,
        ParserConfig::global(),
    );
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(root.world_count(), 1);
    assert_eq!(root.world_by_index(0).unwrap().name(), "w");
}

#[test]
fn legacy_document_converts_forward() {
    let mut root = Root::new();
    let errors = root.load_string(
        r#"<sdf version="1.6">
             <model name="m">
               <link name="l"/>
               <link name="tool"><pose frame="l">0 0 1 0 0 0</pose></link>
             </model>
           </sdf>"#,
        ParserConfig::global(),
    );
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(root.original_version(), "1.6");
    assert_eq!(root.version(), SDF_VERSION);
    // The 1.6 @frame attribute became @relative_to and feeds the graphs.
    let model = root.model().unwrap();
    let tool = model.link_by_name("tool").unwrap();
    assert_eq!(tool.semantic_pose().relative_to(), "l");
    let pose = tool.semantic_pose().resolve("l").unwrap();
    assert!((pose.translation.vector.z - 1.0).abs() < 1e-9);
}

#[test]
fn degrees_pose_parses() {
    let mut root = Root::new();
    let errors = root.load_string(
        r#"<sdf version="1.9">
             <model name="m">
               <link name="l"><pose degrees="true">0 0 0 0 0 90</pose></link>
             </model>
           </sdf>"#,
        ParserConfig::global(),
    );
    assert!(errors.is_empty(), "{errors:?}");
    let link = root.model().unwrap().link_by_name("l").unwrap();
    let (_, _, yaw) = link.semantic_pose().raw_pose().rotation.euler_angles();
    assert!((yaw - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
}

#[test]
fn quat_xyzw_pose_parses() {
    let mut root = Root::new();
    let errors = root.load_string(
        r#"<sdf version="1.9">
             <model name="m">
               <link name="l"><pose rotation_format="quat_xyzw">1 2 3 0 0 0 1</pose></link>
             </model>
           </sdf>"#,
        ParserConfig::global(),
    );
    assert!(errors.is_empty(), "{errors:?}");
    let link = root.model().unwrap().link_by_name("l").unwrap();
    let raw = link.semantic_pose().raw_pose();
    assert!((raw.translation.vector.x - 1.0).abs() < 1e-12);
    assert!(raw.rotation.angle() < 1e-12);
}

#[test]
fn urdf_translator_hook() {
    let config = ParserConfig::new().with_urdf_translator(Arc::new(
        |_urdf: &str| -> Result<String, String> {
            Ok(r#"<sdf version="1.9">
                    <model name="translated"><link name="base"/></model>
                  </sdf>"#
                .to_string())
        },
    ));
    let mut root = Root::new();
    let errors = root.load_string(r#"<robot name="r"><link name="base"/></robot>"#, &config);
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(root.model().unwrap().name(), "translated");
}

#[test]
fn include_via_uri_lookup() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("box")).expect("mkdir");
    std::fs::write(
        dir.path().join("box/model.config"),
        r#"<model><name>box</name><sdf version="1.9">box.sdf</sdf></model>"#,
    )
    .expect("write config");
    std::fs::write(
        dir.path().join("box/box.sdf"),
        r#"<sdf version="1.9"><model name="box"><link name="body"/></model></sdf>"#,
    )
    .expect("write model");
    std::fs::write(
        dir.path().join("world.sdf"),
        r#"<sdf version="1.9">
             <world name="w">
               <include><uri>model://box</uri><name>crate_1</name></include>
               <include><uri>model://box</uri><name>crate_2</name></include>
             </world>
           </sdf>"#,
    )
    .expect("write world");

    let model_dir = dir.path().join("box");
    let config = ParserConfig::new().with_uri_lookup(Arc::new(move |uri: &str| {
        uri.strip_prefix("model://box").map(|_| model_dir.clone())
    }));

    let mut root = Root::new();
    let errors = root.load_file(dir.path().join("world.sdf"), &config);
    assert!(errors.is_empty(), "{errors:?}");
    let world = root.world_by_index(0).unwrap();
    assert_eq!(world.models().len(), 2);
    assert!(world.model_by_name("crate_1").is_some());
    assert!(world.model_by_name("crate_2").is_some());
}

#[test]
fn custom_model_parser_handles_non_sdf_include() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("robot.custom"), "opaque payload").expect("write custom");
    std::fs::write(
        dir.path().join("world.sdf"),
        r#"<sdf version="1.9">
             <world name="w">
               <include><uri>robot.custom</uri></include>
             </world>
           </sdf>"#,
    )
    .expect("write world");

    let config = ParserConfig::new().with_custom_model_parser(Arc::new(
        |path: &std::path::Path| {
            path.extension().and_then(|e| e.to_str()).and_then(|ext| {
                (ext == "custom").then(|| {
                    r#"<sdf version="1.9"><model name="from_custom"><link name="l"/></model></sdf>"#
                        .to_string()
                })
            })
        },
    ));

    let mut root = Root::new();
    let errors = root.load_file(dir.path().join("world.sdf"), &config);
    assert!(errors.is_empty(), "{errors:?}");
    assert!(root
        .world_by_index(0)
        .unwrap()
        .model_by_name("from_custom")
        .is_some());
}

#[test]
fn unrecognized_attribute_policy_err() {
    let config = ParserConfig::new().with_unrecognized_elements(EnforcementPolicy::Err);
    let mut root = Root::new();
    let errors = root.load_string(
        r#"<sdf version="1.9"><world name="w" speed="11"/></sdf>"#,
        &config,
    );
    assert!(errors
        .iter()
        .any(|e| e.code() == ErrorCode::AttributeInvalid));
}

#[test]
fn namespaced_elements_survive_strict_policy() {
    let config = ParserConfig::new().with_unrecognized_elements(EnforcementPolicy::Err);
    let mut root = Root::new();
    let errors = root.load_string(
        r#"<sdf version="1.9">
             <model name="m">
               <link name="l"/>
               <mysim:controller gain="2.5">tuned</mysim:controller>
             </model>
           </sdf>"#,
        &config,
    );
    assert!(errors.is_empty(), "{errors:?}");
    let model = root.model().unwrap();
    let custom = model
        .element()
        .unwrap()
        .borrow()
        .find_element("mysim:controller");
    assert!(custom.is_some());
}

#[test]
fn load_file_missing_reports_file_read() {
    let mut root = Root::new();
    let errors = root.load_file("/definitely/not/here.sdf", ParserConfig::global());
    assert_eq!(errors[0].code(), ErrorCode::FileRead);
    assert_eq!(root.world_count(), 0);
}

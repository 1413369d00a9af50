use anyhow::Result;
use approx::assert_abs_diff_eq;
use skelarm::Config;
use skelarm_core::{dynamics, integrate};
use std::{fs, path::PathBuf, process::Command};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

#[test]
fn test_four_dof_demo_loads() -> Result<()> {
    let config = Config::from_file(demo("four_dof_robot.toml"))?;
    config.validate()?;
    assert_eq!(config.dof(), 4);

    let props = config.link_properties();
    assert_eq!(props[0].length, 1.0);
    assert_eq!(props[3].length, 0.4);

    let mut chain = config.build_chain()?;
    chain.set_q(&[0.0; 4])?;
    let tip = chain.end_effector();
    assert_abs_diff_eq!(tip.x, 2.8, epsilon = 1e-12);
    assert_abs_diff_eq!(tip.y, 0.0, epsilon = 1e-12);

    chain.set_q(&[std::f64::consts::FRAC_PI_2, 0.0, 0.0, 0.0])?;
    let tip = chain.end_effector();
    assert_abs_diff_eq!(tip.x, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(tip.y, 2.8, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_four_dof_demo_stays_static() -> Result<()> {
    let config = Config::from_file(demo("four_dof_robot.toml"))?;
    let mut chain = config.build_chain()?;
    chain.set_dq(&[0.0; 4])?;
    let q0 = chain.q().to_vec();

    let zero = |_t: f64, _s: &skelarm_core::SystemState| vec![0.0; 4];
    integrate(&mut chain, (0.0, 0.1), &zero, 0.01)?;
    for (a, b) in chain.q().iter().zip(&q0) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
    }
    for v in chain.dq() {
        assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-12);
    }
    Ok(())
}

#[test]
fn test_all_demos_are_valid() -> Result<()> {
    for name in ["four_dof_robot.toml", "two_link_pd.toml", "single_link.json"] {
        let config = Config::from_file(demo(name))?;
        let chain = config.build_chain()?;
        config.torque_command(&chain)?;
    }
    Ok(())
}

#[test]
fn test_config_from_temp_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("arm.toml");
    fs::write(
        &path,
        "[[link]]\nl = 1.0\nm = 1.0\ni = 0.1\n\n[external_force]\nfy = 1.0\n",
    )?;

    let config = Config::from_file(&path)?;
    let mut chain = config.build_chain()?;
    let ddq = dynamics::forward_dynamics(&mut chain, &[0.0])?;
    assert_abs_diff_eq!(ddq[0], 1.0 / 0.35, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_unknown_extension_falls_back_to_json() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("arm.conf");
    fs::write(&path, r#"{ "link": [{ "l": 1.0, "m": 1.0, "i": 0.1 }] }"#)?;
    assert_eq!(Config::from_file(&path)?.dof(), 1);
    Ok(())
}

#[test]
fn test_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[[link]]\nlength = \"long\"\n").unwrap();

    let err = Config::from_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("broken.toml"));

    let missing = dir.path().join("missing.toml");
    let err = Config::from_file(&missing).unwrap_err();
    assert!(format!("{err:#}").contains("missing.toml"));
}

#[test]
fn test_simulate_writes_trajectory() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("out/trajectory.json");

    let status = Command::new(env!("CARGO_BIN_EXE_skelarm"))
        .arg("simulate")
        .arg(demo("single_link.json"))
        .args(["--method", "rk4", "--duration", "0.5"])
        .arg("--output")
        .arg(&output)
        .status()?;
    assert!(status.success());

    let record: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output)?)?;
    assert_eq!(record["method"], "rk4");
    let time = record["time"].as_array().unwrap();
    assert_eq!(time.len(), 51);

    // constant torque 0.35 on a joint inertia of 0.35
    let q_end = record["q"][50][0].as_f64().unwrap();
    assert_abs_diff_eq!(q_end, 0.125, epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_check_rejects_bad_config() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[[link]]\nl = -1.0\nm = 1.0\ni = 0.1\n")?;

    let output = Command::new(env!("CARGO_BIN_EXE_skelarm"))
        .arg("check")
        .arg(&path)
        .output()?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn test_simulate_rejects_oversized_duration() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_skelarm"))
        .arg("simulate")
        .arg(demo("single_link.json"))
        .args(["--duration", "1e30"])
        .output()?;
    // an error exit, not a panic
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("steps"));
    Ok(())
}

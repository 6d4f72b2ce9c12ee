#![no_main]
use libfuzzer_sys::fuzz_target;
use treadmill_core::ControllerCfg;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    let Ok(cfg) = treadmill_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    // A validated file must convert into sane controller settings.
    let ctl = ControllerCfg::from(&cfg);
    assert!(ctl.slope_control.level_ms() >= 1);
    assert!(ctl.session.poll_ms >= 1);
});

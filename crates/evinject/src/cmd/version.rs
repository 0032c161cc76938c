use evinject_wire::RECORD_SIZE;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("evinject {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: evinject");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("EVINJECT_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("EVINJECT_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("record_size: {RECORD_SIZE}");
    println!("features: device={}, cli=true", cfg!(feature = "device"));

    Ok(SUCCESS)
}

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("serialcard {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: serialcard");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("SERIALCARD_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: reader={}, cli=true",
        cfg!(feature = "reader")
    );
    println!(
        "defaults: baud={}, response_timeout={:?}",
        serialcard_link::DEFAULT_BAUD_RATE,
        serialcard_session::DEFAULT_RESPONSE_TIMEOUT
    );

    Ok(SUCCESS)
}

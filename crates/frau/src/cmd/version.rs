use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("frau {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: frau");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("FRAU_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("namespace: {}", frau_envelope::NAMESPACE);
    println!(
        "max_message_size: {}",
        frau_envelope::DEFAULT_MAX_MESSAGE_SIZE
    );
    println!("features: port={}, cli=true", cfg!(feature = "port"));

    Ok(SUCCESS)
}

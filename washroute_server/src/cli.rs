use std::{env, env::VarError};

// Only non-secret variables. WRS_WEBHOOK_SECRET and WRS_SWEEP_SECRET must never be echoed.
const PUBLIC_ENVS: [&str; 9] = [
    "RUST_LOG",
    "WRS_HOST",
    "WRS_PORT",
    "WRS_DATABASE_URL",
    "WRS_SIGNATURE_HEADER",
    "WRS_WEBHOOK_SIGNATURE_CHECKS",
    "WRS_SETTLEMENT_HOLD_HOURS",
    "WRS_SWEEP_INTERVAL_MINS",
    "WRS_UNPAID_ORDER_TIMEOUT",
];

/// The server is configured through the environment. Any argument prints the version or the help text, and returns
/// true so the caller can exit without starting the server.
pub fn handle_command_line_args() -> bool {
    let Some(arg) = env::args().nth(1) else {
        return false;
    };
    match arg.as_str() {
        "-V" | "--version" => println!("washroute_server {}", env!("CARGO_PKG_VERSION")),
        _ => {
            println!("\n{}\n", include_str!("./cli-help.txt"));
            print_public_envs();
        },
    }
    true
}

fn print_public_envs() {
    println!("Current environment values (EXCLUDING variables that contain secrets):");
    for name in PUBLIC_ENVS {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    }
}

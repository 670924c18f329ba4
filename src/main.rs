fn main() {
    if let Err(e) = agent_conform::run() {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

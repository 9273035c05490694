fn main() {
    if let Err(e) = smart_home_lib::run() {
        eprintln!("smart-home: {}", e);
        std::process::exit(1);
    }
}

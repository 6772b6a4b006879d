fn main() {
    println!("cargo:rerun-if-changed=config/doorbot.json");

    // Host builds (tests, simulation) have no ESP-IDF sysenv to forward.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

fn main() {
    // Only emit ESP-IDF link/flash metadata when cross-compiling for the
    // espidf target. Host builds (tests, CI) skip it entirely.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}

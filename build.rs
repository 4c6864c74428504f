fn main() {
    // ESP-IDF sysenv propagation is only meaningful for device builds;
    // host builds (tests, fuzzing) skip it.
    if std::env::var("CARGO_FEATURE_ESPIDF").is_ok() {
        embuild::espidf::sysenv::output();
    }
}

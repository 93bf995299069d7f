fn main() {
    if let Err(error) = matchcaster_lib::run() {
        tracing::error!(error = %error, "matchcaster stopped");
        std::process::exit(1);
    }
}

//! Runs the parking service from `parking_lib`. See `parking_lib` for details.

extern crate parking_lib;

fn main() {
    let config = parking_lib::config::Config::new().expect("Can't load app config!");

    // Prepare sentry integration
    let _sentry = parking_lib::sentry_integration::init(config.sentry.as_ref());

    // Prepare logger
    parking_lib::logger::init();

    parking_lib::start_server(config, &None, || ());
}

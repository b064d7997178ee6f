use rocket::launch;

#[launch]
fn rocket() -> _ {
    card_api::init_logger();
    log::info!("starting card API server");
    card_api::rocket()
}

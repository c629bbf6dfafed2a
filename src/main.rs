#[rocket::launch]
fn rocket() -> _ {
    roster_server::rocket()
}

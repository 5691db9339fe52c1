#[rocket::launch]
fn rocket() -> _ {
    product_importer::rocket()
}

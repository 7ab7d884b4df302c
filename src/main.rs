#[actix_web::main]
async fn main() -> std::io::Result<()> {
    testgen_lib::run().await
}

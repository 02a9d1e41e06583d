fn main() {
    if let Err(err) = semdiagram::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

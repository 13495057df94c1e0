fn main() {
    if let Err(err) = grid_reconcile::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

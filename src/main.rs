fn main() {
    islcheck::cli::run();
}

fn main() {
  cli::run();
}

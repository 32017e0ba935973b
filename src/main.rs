fn main() {
    algebra_quest::cli::bin::cli()
}

fn main() {
  brc20_indexer::main();
}

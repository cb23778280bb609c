fn main() {
    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .compile_protos(&["proto/control.proto"], &["proto"])
        .expect("failed to compile control.proto");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 不依赖系统安装的protoc
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    println!("cargo:rerun-if-changed=../proto/login_service.proto");
    tonic_build::compile_protos("../proto/login_service.proto")?;
    Ok(())
}

use burn::{
    backend::Autodiff,
    nn::Initializer,
    optim::SgdConfig,
    tensor::{Tensor, TensorData},
};
use burn_ndarray::{NdArray, NdArrayDevice};
use linear_onnx::{
    model::{BIAS_NAME, WEIGHT_NAME},
    onnx::{export, graph::Dim, ExportConfig, ModelInfo, OnnxRunner},
    sgd_session, LinearRegression, LinearRegressionConfig, RegressionDataset, TrainingConfig,
};

type TestBackend = Autodiff<NdArray<f32, i32>>;

fn trained_model() -> LinearRegression<TestBackend> {
    let config = TrainingConfig::new(
        LinearRegressionConfig::new().with_initializer(Some(Initializer::Zeros)),
        SgdConfig::new(),
    );
    let mut session = sgd_session::<TestBackend>(config, NdArrayDevice::default()).unwrap();
    session.fit(&RegressionDataset::doubling(), |_| {}).unwrap();
    session.into_model()
}

fn predict(model: &LinearRegression<TestBackend>, xs: &[f32]) -> Vec<f32> {
    let input = Tensor::<TestBackend, 2>::from_data(
        TensorData::new(xs.to_vec(), [xs.len(), 1]),
        &NdArrayDevice::default(),
    );
    model.forward(input).into_data().to_vec::<f32>().unwrap()
}

fn example() -> Tensor<TestBackend, 2> {
    Tensor::from_floats([[1.0]], &NdArrayDevice::default())
}

#[test]
fn exported_file_declares_symbolic_batch_dimension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("linear.onnx");
    let model = trained_model();

    export(&model, example(), &path, &ExportConfig::new()).unwrap();
    let info = ModelInfo::from_path(&path).unwrap();

    assert_eq!(info.opset_version, Some(11));
    assert_eq!(info.inputs.len(), 1);
    assert_eq!(info.outputs.len(), 1);
    for (tensor, name) in [(&info.inputs[0], "input"), (&info.outputs[0], "output")] {
        assert_eq!(tensor.name, name);
        assert_eq!(tensor.elem_type.name(), "float");
        assert!(tensor.shape[0].is_symbolic());
        assert_eq!(tensor.shape[1], Dim::Fixed(1));
    }
}

#[test]
fn exported_parameters_match_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("linear.onnx");
    let model = trained_model();
    let params = model.parameters().unwrap();

    export(&model, example(), &path, &ExportConfig::new()).unwrap();
    let info = ModelInfo::from_path(&path).unwrap();

    assert_eq!(info.initializer(WEIGHT_NAME).unwrap().values, vec![params.weight]);
    assert_eq!(info.initializer(BIAS_NAME).unwrap().values, vec![params.bias]);
    assert_eq!(info.op_types, vec!["Gemm".to_string()]);
}

#[test]
fn tract_reproduces_in_process_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("linear.onnx");
    let model = trained_model();
    export(&model, example(), &path, &ExportConfig::new()).unwrap();

    let runner = OnnxRunner::load(&path).unwrap();
    for n in [1usize, 2, 6, 17] {
        let xs: Vec<f32> = (0..n).map(|i| i as f32 * 0.75 - 3.0).collect();
        let expected = predict(&model, &xs);
        let actual = runner.run(&xs).unwrap();

        assert_eq!(actual.len(), n);
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-5, "batch {n}: {a} vs {e}");
        }
    }

    let seven = runner.run(&[7.0]).unwrap();
    assert!((seven[0] - 14.0).abs() < 0.1, "got {}", seven[0]);
}

#[test]
fn runner_rejects_empty_batches() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("linear.onnx");
    export(&trained_model(), example(), &path, &ExportConfig::new()).unwrap();

    assert!(OnnxRunner::load(&path).unwrap().run(&[]).is_err());
}

#[test]
fn export_into_missing_directory_fails_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope").join("linear.onnx");

    let result = export(&trained_model(), example(), &path, &ExportConfig::new());
    assert!(result.is_err());
    assert!(!path.exists());
}

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Round trips against a live RedisAI store
//!
//! Ignored by default. Start a Redis server with the RedisAI module, point
//! `SSDB` at it and run
//! `SSDB=127.0.0.1:6379 cargo test --test redis_store_test -- --ignored`.

#[cfg(feature = "redis")]
mod live {
    use smartredis_mpi::error::BridgeError;
    use smartredis_mpi::{
        ElementKind, RedisStore, Session, StoreConfig, Tensor, TensorStore, ThreadedGroup,
    };

    fn connect() -> RedisStore {
        let config = StoreConfig::from_env(false, "redis_store_test").unwrap();
        RedisStore::connect(&config).unwrap()
    }

    #[test]
    #[ignore]
    fn test_tensor_round_trip() {
        let mut store = connect();
        let tensor = Tensor::vector(vec![0.5f64, -1.25, 3.0]);

        store.put_tensor("srmpi_test.state", &tensor).unwrap();
        let read = store.get_tensor("srmpi_test.state", ElementKind::Double).unwrap();
        assert_eq!(read, tensor);

        let info = Tensor::vector(vec![7i32, -8]);
        store.put_tensor("srmpi_test.info", &info).unwrap();
        assert_eq!(store.get_tensor("srmpi_test.info", ElementKind::Int32).unwrap(), info);

        store.delete_tensor("srmpi_test.state").unwrap();
        store.delete_tensor("srmpi_test.info").unwrap();
        assert!(!store.tensor_exists("srmpi_test.state").unwrap());
    }

    #[test]
    #[ignore]
    fn test_missing_and_mistyped_keys() {
        let mut store = connect();
        store.delete_tensor("srmpi_test.missing").unwrap();

        let err = store.get_tensor("srmpi_test.missing", ElementKind::Double).unwrap_err();
        assert!(matches!(err, BridgeError::KeyError(_)));

        store.put_tensor("srmpi_test.ints", &Tensor::scalar(1i32)).unwrap();
        let err = store.get_tensor("srmpi_test.ints", ElementKind::Double).unwrap_err();
        assert!(matches!(err, BridgeError::TypeError(_)));
        store.delete_tensor("srmpi_test.ints").unwrap();
    }

    #[test]
    #[ignore]
    fn test_session_get_action_over_redis() {
        let config = StoreConfig::from_env(false, "redis_store_test").unwrap();
        let mut seed = connect();
        seed.put_tensor("srmpi_test.action", &Tensor::vector(vec![1.0f64, 2.0, 3.0]))
            .unwrap();

        let actions = ThreadedGroup::run(3, |group| {
            let mut session = Session::connect(group, &config).unwrap();
            let mut action = [0.0f64; 1];
            session.get_action("srmpi_test.action", &mut action).unwrap();
            action[0]
        })
        .unwrap();

        assert_eq!(actions, vec![1.0, 2.0, 3.0]);
        assert!(!seed.tensor_exists("srmpi_test.action").unwrap());
    }
}

mod upload_test;

mod list_service_test;
